//! Minimal TwiML response builder.
//!
//! Only the verbs this server actually emits are modeled: Say, Play,
//! Gather (speech input), and Hangup. Text content and attribute values
//! are always XML-escaped.

/// Seconds of silence before a Gather gives up waiting for speech.
const GATHER_TIMEOUT_SECONDS: u32 = 5;

/// Builder for a TwiML `<Response>` document.
#[derive(Debug, Default)]
pub struct Twiml {
    body: String,
}

impl Twiml {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a `<Say>` verb with escaped text.
    pub fn say(mut self, text: &str) -> Self {
        self.body
            .push_str(&format!("<Say>{}</Say>", escape_xml(text)));
        self
    }

    /// Appends a `<Play>` verb pointing at a cached audio URL.
    pub fn play(mut self, url: &str) -> Self {
        self.body
            .push_str(&format!("<Play>{}</Play>", escape_xml(url)));
        self
    }

    /// Appends a `<Gather>` collecting speech input, wrapping the verbs
    /// built by `inner`. The result posts to `action`.
    pub fn gather(mut self, action: &str, inner: impl FnOnce(Twiml) -> Twiml) -> Self {
        let nested = inner(Twiml::new());
        self.body.push_str(&format!(
            "<Gather input=\"speech\" action=\"{}\" method=\"POST\" \
             speechTimeout=\"auto\" timeout=\"{}\">{}</Gather>",
            escape_xml(action),
            GATHER_TIMEOUT_SECONDS,
            nested.body
        ));
        self
    }

    /// Appends a `<Hangup>` verb.
    pub fn hangup(mut self) -> Self {
        self.body.push_str("<Hangup/>");
        self
    }

    /// Renders the complete XML document.
    pub fn build(self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>{}</Response>",
            self.body
        )
    }
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn say_escapes_reserved_characters() {
        let xml = Twiml::new().say("cuts & <color> \"deals\"").build();
        assert!(xml.contains("<Say>cuts &amp; &lt;color&gt; &quot;deals&quot;</Say>"));
    }

    #[test]
    fn gather_nests_inner_verbs_and_sets_the_action() {
        let xml = Twiml::new()
            .gather("/process-speech", |g| g.play("https://example.com/audio/a1"))
            .build();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>"));
        assert!(xml.contains("action=\"/process-speech\""));
        assert!(xml.contains("input=\"speech\""));
        assert!(xml.contains("<Play>https://example.com/audio/a1</Play></Gather>"));
    }

    #[test]
    fn hangup_closes_the_call() {
        let xml = Twiml::new().say("Goodbye").hangup().build();
        assert!(xml.ends_with("<Say>Goodbye</Say><Hangup/></Response>"));
    }
}
