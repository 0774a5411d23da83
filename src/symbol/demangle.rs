// Thu Jan 22 2026 - Alex

use std::collections::VecDeque;

/// Class named by a dispatch table symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTableName {
    pub class: String,
    pub for_base: Option<String>,
}

/// Recognizes dispatch table symbols of both mangling schemes.
///
/// Itanium `_ZTV` names and MSVC `??_7` names are supported; template
/// instantiations are not and yield `None`.
pub fn dispatch_table_name(symbol: &str) -> Option<DispatchTableName> {
    if let Some(rest) = symbol.strip_prefix("__ZTV").or_else(|| symbol.strip_prefix("_ZTV")) {
        let class = ItaniumNameParser::new(rest).parse()?;
        Some(DispatchTableName { class, for_base: None })
    } else if let Some(rest) = symbol.strip_prefix("??_7") {
        MsvcNameParser::new(rest).parse_dispatch_table()
    } else {
        None
    }
}

pub fn is_dispatch_table_symbol(symbol: &str) -> bool {
    symbol.starts_with("_ZTV") || symbol.starts_with("__ZTV") || symbol.starts_with("??_7")
}

struct ItaniumNameParser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> ItaniumNameParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input: input.as_bytes(), pos: 0 }
    }

    fn parse(&mut self) -> Option<String> {
        let name = match self.peek()? {
            b'N' => {
                self.pos += 1;
                self.parse_nested_name()?
            }
            b'S' if self.input.get(self.pos + 1) == Some(&b't') => {
                self.pos += 2;
                format!("std::{}", self.parse_source_name()?)
            }
            b'0'..=b'9' => self.parse_source_name()?,
            _ => return None,
        };

        if self.pos == self.input.len() {
            Some(name)
        } else {
            None
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn parse_nested_name(&mut self) -> Option<String> {
        let mut parts = Vec::new();

        loop {
            match self.peek()? {
                b'E' => {
                    self.pos += 1;
                    break;
                }
                b'S' if self.input.get(self.pos + 1) == Some(&b't') => {
                    self.pos += 2;
                    parts.push("std".to_string());
                }
                b'0'..=b'9' => parts.push(self.parse_source_name()?),
                _ => return None,
            }
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("::"))
        }
    }

    fn parse_source_name(&mut self) -> Option<String> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }

        let len: usize = std::str::from_utf8(&self.input[start..self.pos]).ok()?.parse().ok()?;
        let end = self.pos.checked_add(len)?;
        let name = std::str::from_utf8(self.input.get(self.pos..end)?).ok()?.to_string();
        self.pos = end;
        Some(name)
    }
}

struct MsvcNameParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> MsvcNameParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_dispatch_table(&mut self) -> Option<DispatchTableName> {
        let class = self.parse_qualified_name()?;

        // `6B` introduces the storage class and the optional "for base" scope.
        if !self.input[self.pos..].starts_with("6B") {
            return None;
        }
        self.pos += 2;

        let for_base = if self.input[self.pos..].starts_with('@') {
            None
        } else {
            Some(self.parse_qualified_name()?)
        };

        Some(DispatchTableName { class, for_base })
    }

    fn parse_qualified_name(&mut self) -> Option<String> {
        let mut parts = VecDeque::new();

        loop {
            let rest = &self.input[self.pos..];
            if rest.starts_with('@') {
                self.pos += 1;
                break;
            }
            if rest.starts_with('?') {
                return None;
            }

            let end = rest.find('@')?;
            parts.push_front(rest[..end].to_string());
            self.pos += end + 1;
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.into_iter().collect::<Vec<_>>().join("::"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_itanium_simple() {
        let name = dispatch_table_name("_ZTV6Widget").unwrap();
        assert_eq!(name.class, "Widget");
        assert_eq!(name.for_base, None);
    }

    #[test]
    fn test_itanium_nested() {
        assert_eq!(dispatch_table_name("_ZTVN4game6engine5ActorE").unwrap().class, "game::engine::Actor");
        assert_eq!(dispatch_table_name("_ZTVSt9exception").unwrap().class, "std::exception");
    }

    #[test]
    fn test_itanium_template_is_rejected() {
        assert!(dispatch_table_name("_ZTVN4game4PoolIiEE").is_none());
    }

    #[test]
    fn test_msvc_primary_and_secondary() {
        let primary = dispatch_table_name("??_7Widget@ui@@6B@").unwrap();
        assert_eq!(primary.class, "ui::Widget");
        assert_eq!(primary.for_base, None);

        let secondary = dispatch_table_name("??_7Derived@@6BBase@@@").unwrap();
        assert_eq!(secondary.class, "Derived");
        assert_eq!(secondary.for_base.as_deref(), Some("Base"));
    }

    #[test]
    fn test_non_dispatch_symbols() {
        assert!(dispatch_table_name("_ZN6Widget4drawEv").is_none());
        assert!(!is_dispatch_table_symbol("main"));
        assert!(is_dispatch_table_symbol("??_7A@@6B@"));
    }
}
