//! Conversation memory — per-session Markdown transcripts.
//!
//! One directory per session under `<work_dir>/sessions/<session_id>/`,
//! holding a `transcript.md` with `### {role} — {timestamp}` delimiters.
//! The transcript is capped by entry count (FIFO — oldest entries dropped
//! first) and re-read on every turn, so the files stay hand-inspectable
//! and hand-editable between runs.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};

use crate::error::AppError;

const TRANSCRIPT_FILENAME: &str = "transcript.md";

/// One transcript entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub role: String,
    pub timestamp: String,
    pub content: String,
}

/// Store for all session transcripts under one root directory.
pub struct SessionMemory {
    root: PathBuf,
    transcript_cap: usize,
}

impl SessionMemory {
    pub fn new(root: impl Into<PathBuf>, transcript_cap: usize) -> Self {
        Self { root: root.into(), transcript_cap }
    }

    /// Append one entry to a session's transcript, creating the session
    /// directory on first use.
    pub fn append(&self, session_id: &str, role: &str, content: &str) -> Result<(), AppError> {
        let dir = self.session_dir(session_id);
        fs::create_dir_all(&dir)
            .map_err(|e| AppError::Memory(format!("cannot create {}: {e}", dir.display())))?;

        let path = dir.join(TRANSCRIPT_FILENAME);
        let existing = fs::read_to_string(&path).unwrap_or_default();
        let mut entries = parse_transcript(&existing);

        entries.push(TranscriptEntry {
            role: role.to_string(),
            timestamp: now_iso8601(),
            content: content.to_string(),
        });

        // FIFO cap: drop oldest.
        while entries.len() > self.transcript_cap {
            entries.remove(0);
        }

        let out = serialise_transcript(&entries);
        let mut f = fs::File::create(&path)
            .map_err(|e| AppError::Memory(format!("cannot write {}: {e}", path.display())))?;
        f.write_all(out.as_bytes())
            .map_err(|e| AppError::Memory(format!("write {}: {e}", path.display())))?;

        Ok(())
    }

    /// Read the last `n` transcript entries for a session. A session that
    /// has never spoken yields an empty history, not an error.
    pub fn history(&self, session_id: &str, n: usize) -> Result<Vec<TranscriptEntry>, AppError> {
        let path = self.session_dir(session_id).join(TRANSCRIPT_FILENAME);
        let text = fs::read_to_string(&path).unwrap_or_default();
        let entries = parse_transcript(&text);
        let start = entries.len().saturating_sub(n);
        Ok(entries[start..].to_vec())
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(sanitise_session_id(session_id))
    }
}

/// Session ids become directory names; strip anything path-like.
fn sanitise_session_id(session_id: &str) -> String {
    let cleaned: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

/// Parse transcript.md into entries by splitting on `### ` headers.
fn parse_transcript(text: &str) -> Vec<TranscriptEntry> {
    let mut entries = Vec::new();
    let mut current: Option<(String, String, Vec<String>)> = None;

    for line in text.lines() {
        if let Some(header) = line.strip_prefix("### ") {
            // Flush previous entry.
            if let Some((role, ts, lines)) = current.take() {
                entries.push(TranscriptEntry {
                    role,
                    timestamp: ts,
                    content: lines.join("\n").trim().to_string(),
                });
            }
            // Parse "role — timestamp"
            let (role, ts) = if let Some((r, t)) = header.split_once(" — ") {
                (r.trim().to_string(), t.trim().to_string())
            } else {
                (header.to_string(), String::new())
            };
            current = Some((role, ts, Vec::new()));
        } else if let Some((_, _, ref mut lines)) = current {
            lines.push(line.to_string());
        }
    }
    // Flush last entry.
    if let Some((role, ts, lines)) = current {
        entries.push(TranscriptEntry {
            role,
            timestamp: ts,
            content: lines.join("\n").trim().to_string(),
        });
    }
    entries
}

/// Serialise entries back to Markdown.
fn serialise_transcript(entries: &[TranscriptEntry]) -> String {
    let mut out = String::new();
    for e in entries {
        out.push_str(&format!("### {} — {}\n\n{}\n\n", e.role, e.timestamp, e.content));
    }
    out
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SessionMemory) {
        let dir = TempDir::new().unwrap();
        let memory = SessionMemory::new(dir.path(), 3);
        (dir, memory)
    }

    #[test]
    fn append_and_read() {
        let (_dir, memory) = setup();

        memory.append("s1", "user", "hello").unwrap();
        memory.append("s1", "assistant", "hi there").unwrap();

        let entries = memory.history("s1", 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].role, "user");
        assert_eq!(entries[0].content, "hello");
        assert_eq!(entries[1].role, "assistant");
        assert_eq!(entries[1].content, "hi there");
    }

    #[test]
    fn sessions_are_isolated() {
        let (_dir, memory) = setup();
        memory.append("s1", "user", "for s1").unwrap();
        memory.append("s2", "user", "for s2").unwrap();

        let h1 = memory.history("s1", 10).unwrap();
        assert_eq!(h1.len(), 1);
        assert_eq!(h1[0].content, "for s1");
    }

    #[test]
    fn fifo_cap_drops_oldest() {
        let (_dir, memory) = setup(); // cap = 3

        for i in 0..5 {
            memory.append("s1", "user", &format!("msg{i}")).unwrap();
        }

        let entries = memory.history("s1", 10).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].content, "msg2");
        assert_eq!(entries[2].content, "msg4");
    }

    #[test]
    fn history_last_n() {
        let (_dir, memory) = setup();
        memory.append("s1", "user", "a").unwrap();
        memory.append("s1", "assistant", "b").unwrap();
        memory.append("s1", "user", "c").unwrap();

        let entries = memory.history("s1", 2).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].content, "b");
        assert_eq!(entries[1].content, "c");
    }

    #[test]
    fn unknown_session_has_empty_history() {
        let (_dir, memory) = setup();
        assert!(memory.history("never-seen", 5).unwrap().is_empty());
    }

    #[test]
    fn multiline_content_survives_round_trip() {
        let (_dir, memory) = setup();
        memory.append("s1", "assistant", "line one\nline two").unwrap();
        let entries = memory.history("s1", 1).unwrap();
        assert_eq!(entries[0].content, "line one\nline two");
    }

    #[test]
    fn session_id_sanitised_for_paths() {
        assert_eq!(sanitise_session_id("../../etc"), "______etc");
        assert_eq!(sanitise_session_id(""), "default");
        assert_eq!(sanitise_session_id("abc-123_X"), "abc-123_X");
    }
}
