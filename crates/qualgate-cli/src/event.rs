//! Decoding of the host hook event and extraction of edited file paths.

use qualgate_common::Error;
use qualgate_hook_types::HookEvent;

/// Tool names whose invocations write files, matched case-insensitively.
pub const WRITE_TOOLS: &[&str] = &["Edit", "Write", "MultiEdit"];

/// Decode one event envelope from raw bytes.
///
/// # Errors
///
/// Returns [`Error::Event`] for non-JSON input, a non-object payload, or a
/// missing/empty required field (`session_id`, `cwd`, `hook_event_name`).
pub fn parse(bytes: &[u8]) -> Result<HookEvent, Error> {
    let event: HookEvent = serde_json::from_slice(bytes)
        .map_err(|e| Error::Event(format!("malformed event payload: {e}")))?;

    for (field, value) in [
        ("session_id", &event.session_id),
        ("cwd", &event.cwd),
        ("hook_event_name", &event.hook_event_name),
    ] {
        if value.is_empty() {
            return Err(Error::Event(format!("missing required field `{field}`")));
        }
    }
    Ok(event)
}

/// Decode the stdin payload: either one JSON event or several, one per line
/// (hosts batch rapid edits as JSON Lines).
///
/// # Errors
///
/// Returns [`Error::Event`] when the payload is empty or any event in it is
/// rejected by [`parse`].
pub fn parse_stream(bytes: &[u8]) -> Result<Vec<HookEvent>, Error> {
    if let Ok(event) = serde_json::from_slice::<HookEvent>(bytes) {
        // Field presence still needs the strict path.
        return parse(bytes).map(|_| vec![event]);
    }

    let events = bytes
        .split(|&b| b == b'\n')
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .map(parse)
        .collect::<Result<Vec<_>, Error>>()?;
    if events.is_empty() {
        return Err(Error::Event("empty event payload".into()));
    }
    Ok(events)
}

/// Collect the files edited across `events`, de-duplicated in first-seen
/// order.
///
/// Tools outside [`WRITE_TOOLS`] contribute nothing; that is not an error,
/// since the host fires hooks for read-only tools too. A write tool with a
/// descriptor that is not a JSON object, or whose `file_path` is not a
/// string, is malformed and rejected.
///
/// # Errors
///
/// Returns [`Error::Event`] for a malformed tool descriptor.
pub fn extract_edited_files(events: &[HookEvent]) -> Result<Vec<String>, Error> {
    let mut files: Vec<String> = Vec::new();

    for event in events {
        let Some(tool) = &event.tool_use else {
            continue;
        };
        if !WRITE_TOOLS.iter().any(|t| t.eq_ignore_ascii_case(&tool.name)) {
            continue;
        }

        if tool.input.is_null() {
            continue; // no descriptor at all; nothing was edited
        }
        let Some(descriptor) = tool.input.as_object() else {
            return Err(Error::Event(format!(
                "tool `{}` has a malformed input descriptor (not an object)",
                tool.name
            )));
        };

        match descriptor.get("file_path") {
            None => {}
            Some(serde_json::Value::String(path)) => {
                if !path.is_empty() && !files.contains(path) {
                    files.push(path.clone());
                }
            }
            Some(other) => {
                return Err(Error::Event(format!(
                    "tool `{}` has a non-string `file_path`: {other}",
                    tool.name
                )));
            }
        }
    }

    Ok(files)
}
