//! Minimal TwiML response document builder.
//!
//! The call-control side of the loop only ever needs three verbs: `<Say>`
//! for spoken prompts, `<Play>` for archived reply audio, and `<Record>` to
//! capture the caller's next utterance. Text and attribute values are
//! XML-escaped.

/// Recording parameters for the `<Record>` verb.
#[derive(Debug, Clone)]
pub struct RecordOptions {
    /// Webhook invoked with the finished recording.
    pub action: String,
    /// Maximum recording length, in seconds.
    pub max_length_secs: u32,
    /// Silence that ends the recording, in seconds.
    pub timeout_secs: u32,
    /// Whether to play a beep before recording starts.
    pub play_beep: bool,
}

/// Builder for a `<Response>` document.
#[derive(Debug, Default)]
pub struct VoiceResponse {
    verbs: Vec<String>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speaks `text` in the given language.
    pub fn say(mut self, text: &str, language: &str) -> Self {
        self.verbs.push(format!(
            "<Say language=\"{}\">{}</Say>",
            escape_xml(language),
            escape_xml(text)
        ));
        self
    }

    /// Plays audio from a URL.
    pub fn play(mut self, url: &str) -> Self {
        self.verbs.push(format!("<Play>{}</Play>", escape_xml(url)));
        self
    }

    /// Records the caller, posting the result to `options.action`.
    pub fn record(mut self, options: &RecordOptions) -> Self {
        self.verbs.push(format!(
            "<Record action=\"{}\" maxLength=\"{}\" timeout=\"{}\" playBeep=\"{}\"/>",
            escape_xml(&options.action),
            options.max_length_secs,
            options.timeout_secs,
            options.play_beep
        ));
        self
    }

    /// Renders the document.
    pub fn to_xml(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>{}</Response>",
            self.verbs.concat()
        )
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
