/// Visual tone shared by every status-like enum.
///
/// Each wire enum maps onto a tone through an exhaustive `match`, so a new
/// variant cannot be rendered without an explicit decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Caution,
    Negative,
    Info,
    Muted,
}

impl Tone {
    /// Single-glyph marker used by the text renderer.
    pub fn marker(self) -> &'static str {
        match self {
            Tone::Positive => "✔",
            Tone::Caution => "⚠",
            Tone::Negative => "✖",
            Tone::Info => "ℹ",
            Tone::Muted => "·",
        }
    }
}
