use std::fs;
use std::path::{Path, PathBuf};

use engine_logging::{engine_error, engine_info, engine_warn};
use postsmith_core::{ConversationEntry, Role};
use postsmith_engine::{ensure_state_dir, AtomicFileWriter};
use serde::{Deserialize, Serialize};

const STATE_FILENAME: &str = ".postsmith_state.ron";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedEntry {
    role: String,
    content: String,
    at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedState {
    conversation: Vec<PersistedEntry>,
}

fn role_tag(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

fn parse_role(tag: &str) -> Option<Role> {
    match tag {
        "user" => Some(Role::User),
        "assistant" => Some(Role::Assistant),
        _ => None,
    }
}

pub(crate) fn load_conversation(state_dir: &Path) -> Vec<ConversationEntry> {
    let path = state_dir.join(STATE_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Vec::new();
        }
        Err(err) => {
            engine_warn!("Failed to read archived state from {:?}: {}", path, err);
            return Vec::new();
        }
    };

    let state: PersistedState = match ron::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            engine_warn!("Failed to parse archived state from {:?}: {}", path, err);
            return Vec::new();
        }
    };

    let conversation = state
        .conversation
        .into_iter()
        .filter_map(|entry| {
            let role = parse_role(&entry.role)?;
            Some(ConversationEntry {
                role,
                content: entry.content,
                at: entry.at,
            })
        })
        .collect();

    engine_info!("Loaded archived conversation from {:?}", path);
    conversation
}

pub(crate) fn save_conversation(state_dir: &Path, conversation: &[ConversationEntry]) {
    if let Err(err) = ensure_state_dir(state_dir) {
        engine_error!("Failed to ensure state dir {:?}: {}", state_dir, err);
        return;
    }

    let state = PersistedState {
        conversation: conversation
            .iter()
            .map(|entry| PersistedEntry {
                role: role_tag(entry.role).to_string(),
                content: entry.content.clone(),
                at: entry.at,
            })
            .collect(),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&state, pretty) {
        Ok(text) => text,
        Err(err) => {
            engine_error!("Failed to serialize archived state: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(PathBuf::from(state_dir));
    if let Err(err) = writer.write(STATE_FILENAME, &content) {
        engine_error!("Failed to write archived state to {:?}: {}", state_dir, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_conversation_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let entries = vec![
            ConversationEntry {
                role: Role::User,
                content: "write a post about rust".to_string(),
                at: 1_700_000_000,
            },
            ConversationEntry {
                role: Role::Assistant,
                content: "Rust is a systems language.".to_string(),
                at: 1_700_000_005,
            },
        ];

        save_conversation(dir.path(), &entries);
        let restored = load_conversation(dir.path());
        assert_eq!(restored, entries);
    }

    #[test]
    fn missing_archive_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_conversation(dir.path()).is_empty());
    }

    #[test]
    fn malformed_archive_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path()).expect("state dir");
        fs::write(dir.path().join(STATE_FILENAME), "not ron at all").expect("write");
        assert!(load_conversation(dir.path()).is_empty());
    }

    #[test]
    fn unknown_roles_are_skipped_on_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let text = r#"(conversation: [(role: "system", content: "x", at: 1), (role: "user", content: "y", at: 2)])"#;
        fs::write(dir.path().join(STATE_FILENAME), text).expect("write");

        let restored = load_conversation(dir.path());
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].role, Role::User);
    }
}
