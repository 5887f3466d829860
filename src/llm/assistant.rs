//! Chat and suggestion flows on top of an [`LlmProvider`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::provider::{extract_json, ChatRequest, LlmError, LlmProvider, LlmResult, ModelReply, ToolCall, ToolSpec, Turn};
use crate::activity::RecentTitles;
use crate::models::{Hymn, Language};
use crate::seed;

pub const FIND_HYMN_LYRICS: &str = "findHymnLyrics";

/// Shown in place of a reply whenever the model call fails.
pub const APOLOGY: &str =
    "Sorry, I'm having trouble answering right now. Please try again in a moment.";

const CHAT_INSTRUCTION: &str = "You are a friendly assistant for a church congregation. \
When asked for the lyrics of a hymn, call the findHymnLyrics tool first and prefer its result. \
If the tool does not find the hymn, answer from your general knowledge. \
Whenever your answer contains hymn lyrics, put them between [START_LYRICS] and [END_LYRICS] \
on their own lines, with any other text outside the markers.";

const SUGGEST_INSTRUCTION: &str = "You help a church member choose what to read and sing next. \
Given their recently viewed readings, hymns and service items, suggest a few responsive readings \
and hymns by title. Reply as JSON: \
{\"readings\": [\"title\", ...], \"hymns\": [\"title\", ...], \"reason\": \"one sentence\"}.";

fn find_hymn_lyrics_tool() -> ToolSpec {
    ToolSpec {
        name: FIND_HYMN_LYRICS.to_string(),
        description: "Find the lyrics of a hymn in the church hymnal by its title \
                      in Hiligaynon, Filipino or English."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "Hymn title to look up" }
            },
            "required": ["title"]
        }),
    }
}

/// Result of a hymn lookup as handed back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HymnLookup {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl HymnLookup {
    fn not_found() -> Self {
        Self {
            found: false,
            title: None,
            lyrics: None,
            language: None,
        }
    }
}

/// Case-insensitive title lookup: an exact title match anywhere wins over a
/// substring match. Lyrics come from the language whose title matched.
pub fn find_hymn_lyrics(hymns: &[Hymn], query: &str) -> HymnLookup {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return HymnLookup::not_found();
    }

    let titled = || {
        hymns.iter().flat_map(|hymn| {
            Language::ALL
                .into_iter()
                .filter_map(move |lang| hymn.title(lang).map(|title| (hymn, lang, title)))
        })
    };

    let hit = titled()
        .find(|(_, _, title)| title.to_lowercase() == needle)
        .or_else(|| titled().find(|(_, _, title)| title.to_lowercase().contains(&needle)));

    let Some((hymn, lang, title)) = hit else {
        return HymnLookup::not_found();
    };

    let (language, lyrics) = match hymn.lyrics(lang) {
        Some(lyrics) => (lang, lyrics),
        None => match hymn.primary_lyrics() {
            Some(found) => found,
            None => return HymnLookup::not_found(),
        },
    };

    HymnLookup {
        found: true,
        title: Some(title.to_string()),
        lyrics: Some(lyrics.to_string()),
        language: Some(language.name().to_string()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(default)]
    pub readings: Vec<String>,
    #[serde(default)]
    pub hymns: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suggestions {
    /// No activity yet, so nothing was asked.
    Empty,
    Ready(Suggestion),
    /// The call failed; carries the message to show.
    Failed(String),
}

pub struct Assistant {
    provider: Arc<dyn LlmProvider>,
    hymns: Vec<Hymn>,
    max_tool_rounds: usize,
}

impl Assistant {
    /// The lookup tool searches the bundled hymn dataset.
    pub fn new(provider: Arc<dyn LlmProvider>, max_tool_rounds: usize) -> Self {
        Self::with_hymns(provider, seed::hymns(), max_tool_rounds)
    }

    pub fn with_hymns(provider: Arc<dyn LlmProvider>, hymns: Vec<Hymn>, max_tool_rounds: usize) -> Self {
        Self {
            provider,
            hymns,
            max_tool_rounds: max_tool_rounds.max(1),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Answer a prompt. Failures come back as [`APOLOGY`].
    pub fn chat(&self, prompt: &str) -> String {
        match self.try_chat(prompt) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, provider = self.provider_name(), "Chat request failed");
                APOLOGY.to_string()
            }
        }
    }

    pub fn try_chat(&self, prompt: &str) -> LlmResult<String> {
        let mut request = ChatRequest::new(CHAT_INSTRUCTION)
            .user(prompt)
            .tool(find_hymn_lyrics_tool());

        for round in 0..self.max_tool_rounds {
            match self.provider.chat(&request)? {
                ModelReply::Text(text) => return Ok(text),
                ModelReply::ToolCall(call) => {
                    tracing::debug!(round, tool = %call.name, "Model requested tool");
                    let content = self.run_tool(&call);
                    let (call_id, name) = (call.id.clone(), call.name.clone());
                    request.turns.push(Turn::ToolCall(call));
                    request.turns.push(Turn::ToolResult {
                        call_id,
                        name,
                        content,
                    });
                }
            }
        }

        Err(LlmError::ToolRounds(self.max_tool_rounds))
    }

    fn run_tool(&self, call: &ToolCall) -> Value {
        if call.name != FIND_HYMN_LYRICS {
            tracing::warn!(tool = %call.name, "Model called an unknown tool");
            return json!({ "error": format!("unknown tool {}", call.name) });
        }
        let title = call
            .arguments
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let lookup = find_hymn_lyrics(&self.hymns, title);
        tracing::debug!(title, found = lookup.found, "Hymn lookup");
        serde_json::to_value(lookup).unwrap_or_else(|_| json!({ "found": false }))
    }

    /// Suggest readings and hymns from recent activity.
    pub fn suggest(&self, recent: &RecentTitles) -> Suggestions {
        if recent.is_empty() {
            return Suggestions::Empty;
        }
        match self.try_suggest(recent) {
            Ok(suggestion) => Suggestions::Ready(suggestion),
            Err(e) => {
                tracing::error!(error = %e, provider = self.provider_name(), "Suggestion request failed");
                Suggestions::Failed(APOLOGY.to_string())
            }
        }
    }

    fn try_suggest(&self, recent: &RecentTitles) -> LlmResult<Suggestion> {
        let activity = json!({
            "recentReadings": recent.readings,
            "recentHymns": recent.hymns,
            "recentProgramItems": recent.program_items,
        });
        let request = ChatRequest::new(SUGGEST_INSTRUCTION)
            .user(activity.to_string())
            .json();

        let text = match self.provider.chat(&request)? {
            ModelReply::Text(text) => text,
            ModelReply::ToolCall(call) => {
                return Err(LlmError::Parse {
                    provider: self.provider_name(),
                    message: format!("unexpected tool call {}", call.name),
                })
            }
        };

        serde_json::from_str(&extract_json(&text)).map_err(|e| LlmError::Parse {
            provider: self.provider_name(),
            message: format!("{} - Response was: {}", e, text),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies and records every request it sees.
    #[derive(Default)]
    pub struct ScriptedProvider {
        replies: Mutex<VecDeque<LlmResult<ModelReply>>>,
        pub requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedProvider {
        pub fn new(replies: Vec<LlmResult<ModelReply>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl LlmProvider for ScriptedProvider {
        fn chat(&self, request: &ChatRequest) -> LlmResult<ModelReply> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::Empty("scripted")))
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    pub fn text(s: &str) -> LlmResult<ModelReply> {
        Ok(ModelReply::Text(s.to_string()))
    }

    pub fn lookup(title: &str) -> LlmResult<ModelReply> {
        Ok(ModelReply::ToolCall(ToolCall {
            id: "call_1".to_string(),
            name: FIND_HYMN_LYRICS.to_string(),
            arguments: json!({ "title": title }),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_lookup_prefers_exact_match() {
        let medley = Hymn {
            id: "1".to_string(),
            title_english: Some("Amazing Grace Medley".to_string()),
            lyrics_english: Some("Medley".to_string()),
            ..Default::default()
        };
        let exact = Hymn {
            id: "2".to_string(),
            title_english: Some("Amazing Grace".to_string()),
            lyrics_english: Some("Amazing grace! How sweet the sound".to_string()),
            ..Default::default()
        };
        let lookup = find_hymn_lyrics(&[medley, exact], "AMAZING grace");
        assert!(lookup.found);
        assert_eq!(lookup.title.as_deref(), Some("Amazing Grace"));
        assert_eq!(lookup.language.as_deref(), Some("English"));
    }

    #[test]
    fn test_lookup_falls_back_to_substring_and_other_languages() {
        let hymns = seed::hymns();
        let lookup = find_hymn_lyrics(&hymns, "grasya");
        assert!(lookup.found);
        assert_eq!(lookup.title.as_deref(), Some("Makatilingala nga Grasya"));
        // No Hiligaynon lyrics in the dataset, so the first available language is used.
        assert_eq!(lookup.language.as_deref(), Some("English"));
        assert!(lookup.lyrics.unwrap().starts_with("Amazing grace"));
    }

    #[test]
    fn test_lookup_not_found() {
        let hymns = seed::hymns();
        assert_eq!(find_hymn_lyrics(&hymns, "Nonexistent Song"), HymnLookup::not_found());
        assert!(!find_hymn_lyrics(&hymns, "   ").found);
        assert_eq!(
            serde_json::to_value(HymnLookup::not_found()).unwrap(),
            json!({ "found": false })
        );
    }

    #[test]
    fn test_chat_runs_tool_then_answers() {
        let provider = ScriptedProvider::new(vec![
            lookup("Amazing Grace"),
            text("Here it is:\n[START_LYRICS]\nAmazing grace!\n[END_LYRICS]"),
        ]);
        let assistant = Assistant::new(provider.clone(), 4);

        let reply = assistant.chat("Lyrics for Amazing Grace please");
        assert!(reply.contains("[START_LYRICS]"));
        assert_eq!(provider.calls(), 2);

        let requests = provider.requests.lock().unwrap();
        let second = &requests[1];
        assert!(matches!(&second.turns[1], Turn::ToolCall(call) if call.name == FIND_HYMN_LYRICS));
        match &second.turns[2] {
            Turn::ToolResult { call_id, content, .. } => {
                assert_eq!(call_id, "call_1");
                assert_eq!(content["found"], true);
                assert_eq!(content["title"], "Amazing Grace");
            }
            other => panic!("expected tool result, got {:?}", other),
        }
    }

    #[test]
    fn test_chat_stops_after_max_tool_rounds() {
        let provider = ScriptedProvider::new((0..10).map(|_| lookup("Doxology")).collect());
        let assistant = Assistant::new(provider.clone(), 4);
        assert!(matches!(assistant.try_chat("loop"), Err(LlmError::ToolRounds(4))));
        assert_eq!(provider.calls(), 4);
    }

    #[test]
    fn test_chat_failure_becomes_apology() {
        let provider = ScriptedProvider::new(vec![Err(LlmError::Request {
            provider: "scripted",
            message: "connection refused".to_string(),
        })]);
        let assistant = Assistant::new(provider.clone(), 4);
        assert_eq!(assistant.chat("hello"), APOLOGY);
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_suggest_skips_call_without_activity() {
        let provider = ScriptedProvider::new(vec![]);
        let assistant = Assistant::new(provider.clone(), 4);
        assert_eq!(assistant.suggest(&RecentTitles::default()), Suggestions::Empty);
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_suggest_parses_fenced_json() {
        let provider = ScriptedProvider::new(vec![text(
            "```json\n{\"readings\": [\"Psalm 23\"], \"hymns\": [\"It Is Well\"], \"reason\": \"Comfort.\"}\n```",
        )]);
        let assistant = Assistant::new(provider.clone(), 4);
        let recent = RecentTitles {
            hymns: vec!["Amazing Grace".to_string()],
            ..Default::default()
        };

        let expected = Suggestion {
            readings: vec!["Psalm 23".to_string()],
            hymns: vec!["It Is Well".to_string()],
            reason: "Comfort.".to_string(),
        };
        assert_eq!(assistant.suggest(&recent), Suggestions::Ready(expected));

        let requests = provider.requests.lock().unwrap();
        assert!(requests[0].json);
        assert!(requests[0].tools.is_empty());
    }

    #[test]
    fn test_suggest_bad_json_fails_softly() {
        let provider = ScriptedProvider::new(vec![text("I think you'd like Psalm 23.")]);
        let assistant = Assistant::new(provider, 4);
        let recent = RecentTitles {
            readings: vec!["A Psalm of Praise".to_string()],
            ..Default::default()
        };
        assert_eq!(assistant.suggest(&recent), Suggestions::Failed(APOLOGY.to_string()));
    }
}
