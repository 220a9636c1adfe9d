//! Command line parsing: positional arguments and `-switch[=value]` tokens.

/// A parsed command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandParameters {
    /// The whole line as typed, trimmed
    pub raw: String,
    /// First token
    pub command: String,
    /// Positional arguments, quotes removed
    pub args: Vec<String>,
    /// `-name` or `-name=value` tokens, in order
    pub switches: Vec<(String, Option<String>)>,
}

impl CommandParameters {
    /// Parse one line. Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let raw = line.trim();
        let mut tokens = tokenize(raw).into_iter();
        let command = tokens.next()?;

        let mut args = Vec::new();
        let mut switches = Vec::new();
        for token in tokens {
            match as_switch(&token.text) {
                Some(switch) if !token.quoted => switches.push(switch),
                _ => args.push(token.text),
            }
        }
        Some(Self {
            raw: raw.to_string(),
            command: command.text,
            args,
            switches,
        })
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Everything after the command name, as typed.
    pub fn args_text(&self) -> &str {
        self.raw
            .strip_prefix(self.command.as_str())
            .map_or("", str::trim_start)
    }

    pub fn has_switch(&self, name: &str) -> bool {
        self.switches.iter().any(|(n, _)| n == name)
    }

    pub fn switch_value(&self, name: &str) -> Option<&str> {
        self.switches
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }
}

struct Token {
    text: String,
    quoted: bool,
}

/// Split on whitespace, honouring double quotes.
fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
                pending = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if pending {
                    tokens.push(Token {
                        text: std::mem::take(&mut current),
                        quoted,
                    });
                }
                quoted = false;
                pending = false;
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        tokens.push(Token {
            text: current,
            quoted,
        });
    }
    tokens
}

/// `-name` / `-name=value`; a lone dash or a negative number is not a switch.
fn as_switch(token: &str) -> Option<(String, Option<String>)> {
    let body = token.strip_prefix('-')?;
    if !body.chars().next()?.is_alphabetic() {
        return None;
    }
    Some(match body.split_once('=') {
        Some((name, value)) => (name.to_string(), Some(value.to_string())),
        None => (body.to_string(), None),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line() {
        assert_eq!(CommandParameters::parse("   "), None);
    }

    #[test]
    fn test_args_and_switches() {
        let p = CommandParameters::parse("events -search=FTP extra -v").unwrap();
        assert_eq!(p.command, "events");
        assert_eq!(p.args, vec!["extra"]);
        assert_eq!(p.switch_value("search"), Some("FTP"));
        assert!(p.has_switch("v"));
        assert_eq!(p.switch_value("v"), None);
        assert!(!p.has_switch("search=FTP"));
    }

    #[test]
    fn test_quotes_group_words() {
        let p = CommandParameters::parse(r#"stopthread "Demo child 1""#).unwrap();
        assert_eq!(p.arg(0), Some("Demo child 1"));
        assert_eq!(p.args_text(), r#""Demo child 1""#);
    }

    #[test]
    fn test_negative_numbers_and_quoted_dashes_are_args() {
        let p = CommandParameters::parse(r#"fire PostLogin -5 "-x""#).unwrap();
        assert_eq!(p.args, vec!["PostLogin", "-5", "-x"]);
        assert!(p.switches.is_empty());
    }

    #[test]
    fn test_empty_quotes_are_an_argument() {
        let p = CommandParameters::parse(r#"fire PostLogin """#).unwrap();
        assert_eq!(p.args, vec!["PostLogin", ""]);
    }
}
