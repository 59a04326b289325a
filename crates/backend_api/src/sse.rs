use serde_json::Value;

/// Incremental decoder for line-framed streaming bodies.
///
/// Providers deliver `data: <json>` lines; transport chunks may split a line
/// at any byte boundary, so bytes are buffered until a newline arrives.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: String,
}

impl SseLineDecoder {
    /// Feed arbitrary bytes into the decoder and drain complete lines.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
        let mut lines = Vec::new();

        while let Some(split) = self.buffer.find('\n') {
            let line = self.buffer[..split].trim_end_matches('\r').to_owned();
            self.buffer.drain(0..split + 1);
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }

        lines
    }

    #[must_use]
    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty()
    }
}

/// Extracts the text delta carried by one streamed line.
///
/// A literal `[DONE]` payload, a `message_stop` frame, and any JSON parse
/// failure all yield the empty delta; truncated frames are expected when the
/// transport closes mid-line and must not fail the stream. Delta text is
/// read from `choices[0].delta.content` (OpenAI family) or `delta.text`
/// (Anthropic family).
#[must_use]
pub fn extract_delta(line: &str) -> String {
    let Some(payload) = line.trim_start().strip_prefix("data:") else {
        return String::new();
    };
    let payload = payload.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return String::new();
    }

    let Ok(value) = serde_json::from_str::<Value>(payload) else {
        return String::new();
    };
    if value.get("type").and_then(Value::as_str) == Some("message_stop") {
        return String::new();
    }

    if let Some(text) = value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
    {
        return text.to_owned();
    }
    if let Some(text) = value.pointer("/delta/text").and_then(Value::as_str) {
        return text.to_owned();
    }

    String::new()
}
