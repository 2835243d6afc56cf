use cssparser::{
    parse_important, AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, QualifiedRuleParser,
    RuleBodyItemParser, RuleBodyParser,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Subset of computed style the classifier and filters read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub cursor: String,
    pub opacity: f64,
    pub pointer_events: String,
    pub position: String,
    pub z_index: Option<i64>,
    pub overflow_x: String,
    pub overflow_y: String,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
            cursor: "auto".to_string(),
            opacity: 1.0,
            pointer_events: "auto".to_string(),
            position: "static".to_string(),
            z_index: None,
            overflow_x: "visible".to_string(),
            overflow_y: "visible".to_string(),
        }
    }
}

impl ComputedStyle {
    /// Fresh style for a child, carrying over the inherited properties.
    pub fn inherit_from(parent: &ComputedStyle) -> Self {
        Self {
            visibility: parent.visibility.clone(),
            cursor: parent.cursor.clone(),
            pointer_events: parent.pointer_events.clone(),
            ..Self::default()
        }
    }

    pub fn is_display_none(&self) -> bool {
        self.display == "none"
    }

    pub fn is_hidden(&self) -> bool {
        self.visibility == "hidden" || self.visibility == "collapse"
    }

    pub fn is_pointer(&self) -> bool {
        self.cursor == "pointer"
    }

    pub fn apply_declarations(&mut self, declarations: &[(String, String)]) {
        for (property, value) in declarations {
            match property.as_str() {
                "display" => self.display = value.clone(),
                "visibility" => self.visibility = value.clone(),
                "cursor" => self.cursor = value.clone(),
                "opacity" => {
                    if let Ok(opacity) = value.parse::<f64>() {
                        self.opacity = opacity;
                    }
                }
                "pointer-events" => self.pointer_events = value.clone(),
                "position" => self.position = value.clone(),
                "z-index" => self.z_index = value.parse::<i64>().ok(),
                "overflow" => {
                    let mut parts = value.split_whitespace();
                    if let Some(x) = parts.next() {
                        self.overflow_x = x.to_string();
                        self.overflow_y = parts.next().unwrap_or(x).to_string();
                    }
                }
                "overflow-x" => self.overflow_x = value.clone(),
                "overflow-y" => self.overflow_y = value.clone(),
                _ => {}
            }
        }
    }
}

/// Declaration-list parser for `style` attributes. Values are kept as their
/// source text; `!important` is dropped.
struct InlineDeclarations;

impl<'i> DeclarationParser<'i> for InlineDeclarations {
    type Declaration = (String, String);
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        input.skip_whitespace();
        let start = input.position();
        let important_at = loop {
            let position = input.position();
            if input.try_parse(parse_important).is_ok() {
                break Some(position);
            }
            if input.next().is_err() {
                break None;
            }
        };
        let end = important_at.unwrap_or_else(|| input.position());
        input.expect_exhausted()?;

        let value = input.slice(start..end).trim().to_ascii_lowercase();
        if value.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok((name.to_ascii_lowercase(), value))
    }
}

impl<'i> AtRuleParser<'i> for InlineDeclarations {
    type Prelude = ();
    type AtRule = (String, String);
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for InlineDeclarations {
    type Prelude = ();
    type QualifiedRule = (String, String);
    type Error = ();
}

impl<'i> RuleBodyItemParser<'i, (String, String), ()> for InlineDeclarations {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Splits an inline `style` attribute into lower-cased `(property, value)`
/// pairs, skipping declarations that fail to parse.
pub fn parse_inline_style(style: &str) -> Vec<(String, String)> {
    let mut input = ParserInput::new(style);
    let mut parser = Parser::new(&mut input);
    let mut declarations = InlineDeclarations;
    RuleBodyParser::new(&mut parser, &mut declarations)
        .filter_map(|declaration| match declaration {
            Ok(declaration) => Some(declaration),
            Err((err, source)) => {
                trace!("Skipping style declaration {:?}: {:?}", source, err.kind);
                None
            }
        })
        .collect()
}

/// Reads a `px` (or unitless) length out of parsed declarations.
pub fn declared_px(declarations: &[(String, String)], property: &str) -> Option<f64> {
    declarations
        .iter()
        .rev()
        .find(|(name, _)| name == property)
        .and_then(|(_, value)| value.trim_end_matches("px").trim().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inline_declarations() {
        let decls = parse_inline_style("cursor: pointer; Z-Index: 10 ;overflow: hidden auto; width:1px");
        let mut style = ComputedStyle::default();
        style.apply_declarations(&decls);

        assert!(style.is_pointer());
        assert_eq!(style.z_index, Some(10));
        assert_eq!(style.overflow_x, "hidden");
        assert_eq!(style.overflow_y, "auto");
        assert_eq!(declared_px(&decls, "width"), Some(1.0));
    }

    #[test]
    fn skips_comments_priority_and_malformed_declarations() {
        let decls = parse_inline_style(
            "/* reset */ display: NONE !important; color red; cursor: ; background: url(a;b.png) no-repeat; opacity: 0.5",
        );
        assert_eq!(
            decls,
            vec![
                ("display".to_string(), "none".to_string()),
                ("background".to_string(), "url(a;b.png) no-repeat".to_string()),
                ("opacity".to_string(), "0.5".to_string()),
            ]
        );
    }

    #[test]
    fn inherits_only_inherited_properties() {
        let mut parent = ComputedStyle::default();
        parent.apply_declarations(&parse_inline_style("cursor:pointer;display:none;visibility:hidden"));
        let child = ComputedStyle::inherit_from(&parent);

        assert!(child.is_pointer());
        assert!(child.is_hidden());
        assert!(!child.is_display_none());
    }
}
