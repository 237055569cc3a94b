use serde::Deserialize;
use std::fmt;

/// Direction of a parsed channel signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Buy,
    Sell,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Buy => write!(f, "buy"),
            SignalKind::Sell => write!(f, "sell"),
        }
    }
}

/// A typed trading instruction extracted from one channel message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub kind: SignalKind,
    /// Token mint address, never empty
    pub token_address: String,
    /// Human readable token name, used for logging only
    pub label: Option<String>,
}

impl Signal {
    pub fn buy(token_address: impl Into<String>) -> Self {
        Self {
            kind: SignalKind::Buy,
            token_address: token_address.into(),
            label: None,
        }
    }

    pub fn sell(token_address: impl Into<String>) -> Self {
        Self {
            kind: SignalKind::Sell,
            token_address: token_address.into(),
            label: None,
        }
    }

    fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }
}

/// Text markers that delimit signals inside channel posts.
///
/// Defaults match the format of the signal channels the bot was built for:
///
/// ```text
/// ☘️ PEPE ($PEPE)
/// CA: 7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr
/// 🤴 Price: ...
/// ```
///
/// Sell alerts carry the marker in the body and the mint in the attached
/// link, after the last separator (`https://.../token_<mint>`).
#[derive(Debug, Clone, Deserialize)]
pub struct SignalMarkers {
    #[serde(default = "default_buy_start")]
    pub buy_start: String,
    #[serde(default = "default_buy_end")]
    pub buy_end: String,
    #[serde(default = "default_sell_marker")]
    pub sell_marker: String,
    #[serde(default = "default_link_separator")]
    pub link_separator: String,
    #[serde(default = "default_buy_label_start")]
    pub buy_label_start: String,
    #[serde(default = "default_buy_label_end")]
    pub buy_label_end: String,
    #[serde(default = "default_sell_label_end")]
    pub sell_label_end: String,
}

fn default_buy_start() -> String {
    "CA: ".to_string()
}

fn default_buy_end() -> String {
    "\n🤴 Price".to_string()
}

fn default_sell_marker() -> String {
    "🔥🔥🔥".to_string()
}

fn default_link_separator() -> String {
    "_".to_string()
}

fn default_buy_label_start() -> String {
    "☘️ ".to_string()
}

fn default_buy_label_end() -> String {
    "($".to_string()
}

fn default_sell_label_end() -> String {
    "| $".to_string()
}

impl Default for SignalMarkers {
    fn default() -> Self {
        Self {
            buy_start: default_buy_start(),
            buy_end: default_buy_end(),
            sell_marker: default_sell_marker(),
            link_separator: default_link_separator(),
            buy_label_start: default_buy_label_start(),
            buy_label_end: default_buy_label_end(),
            sell_label_end: default_sell_label_end(),
        }
    }
}

/// Turns raw channel text into buy/sell signals.
///
/// Parsing never fails loudly: anything that does not match a known
/// pattern yields `None`.
#[derive(Debug, Clone, Default)]
pub struct SignalParser {
    markers: SignalMarkers,
}

impl SignalParser {
    pub fn new(markers: SignalMarkers) -> Self {
        Self { markers }
    }

    /// Parse a message body and its optional attached link.
    ///
    /// The buy pattern is checked first; the sell pattern only when no buy
    /// pattern is present.
    pub fn parse(&self, text: &str, link: Option<&str>) -> Option<Signal> {
        if let Some(token) = substring_between(text, &self.markers.buy_start, &self.markers.buy_end) {
            let token = token.trim();
            if token.is_empty() {
                return None;
            }
            let label = self.label_between(text, &self.markers.buy_label_start, &self.markers.buy_label_end);
            return Some(Signal::buy(token).with_label(label));
        }

        if self.markers.sell_marker.is_empty() || !text.contains(&self.markers.sell_marker) {
            return None;
        }

        let token = self.token_from_link(link?)?;
        let label = self.label_between(text, &self.markers.sell_marker, &self.markers.sell_label_end);
        Some(Signal::sell(token).with_label(label))
    }

    fn token_from_link(&self, link: &str) -> Option<String> {
        let (_, tail) = link.trim().rsplit_once(self.markers.link_separator.as_str())?;
        let token = tail.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    fn label_between(&self, text: &str, start: &str, end: &str) -> Option<String> {
        substring_between(text, start, end)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Text between the first `start` and the first `end` after it.
pub fn substring_between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    if start.is_empty() || end.is_empty() {
        return None;
    }
    let from = text.find(start)? + start.len();
    let len = text[from..].find(end)?;
    Some(&text[from..from + len])
}
