//! XML encoding of expression trees.
//!
//! Every node writes the XACML element it was (or would have been) parsed
//! from. Output is text-stable: the same tree always encodes to the same
//! bytes, so encoded forms can be compared directly in tests and logs.

use std::fmt::{self, Write};

use crate::apply::Apply;
use crate::attr::AttributeValue;
use crate::condition::Condition;
use crate::expression::{AttributeDesignator, AttributeSelector, Expression};
use crate::variable::{VariableDefinition, VariableReference};

/// Tracks the current indentation depth during encoding.
#[derive(Debug, Clone)]
pub struct Indenter {
    level: usize,
    width: usize,
}

impl Indenter {
    pub fn new() -> Self {
        Self { level: 0, width: 2 }
    }

    pub fn indent(&mut self) {
        self.level += 1;
    }

    pub fn unindent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    fn pad(&self, out: &mut dyn Write) -> fmt::Result {
        for _ in 0..self.level * self.width {
            out.write_char(' ')?;
        }
        Ok(())
    }
}

impl Default for Indenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Escapes text and attribute content.
fn escape(s: &str, out: &mut dyn Write) -> fmt::Result {
    for c in s.chars() {
        match c {
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '"' => out.write_str("&quot;")?,
            c => out.write_char(c)?,
        }
    }
    Ok(())
}

/// A node that can write its XML form.
pub trait XmlEncode {
    fn encode(&self, out: &mut dyn Write, indenter: &mut Indenter) -> fmt::Result;

    /// The encoded form as a string.
    fn to_xml(&self) -> String {
        let mut out = String::new();
        let mut indenter = Indenter::new();
        // Writing to a String cannot fail.
        let _ = self.encode(&mut out, &mut indenter);
        out
    }
}

impl XmlEncode for AttributeValue {
    fn encode(&self, out: &mut dyn Write, indenter: &mut Indenter) -> fmt::Result {
        if let AttributeValue::Bag(bag) = self {
            // Bags have no literal XML form of their own; the elements are
            // written in sequence.
            for v in bag.iter() {
                v.encode(out, indenter)?;
            }
            return Ok(());
        }
        indenter.pad(out)?;
        write!(out, "<AttributeValue DataType=\"{}\">", self.attr_type().identifier())?;
        escape(&self.to_string(), out)?;
        writeln!(out, "</AttributeValue>")
    }
}

impl XmlEncode for AttributeDesignator {
    fn encode(&self, out: &mut dyn Write, indenter: &mut Indenter) -> fmt::Result {
        indenter.pad(out)?;
        write!(
            out,
            "<{} AttributeId=\"",
            self.category.element_name()
        )?;
        escape(&self.attribute_id, out)?;
        write!(out, "\" DataType=\"{}\"", self.attr_type.identifier())?;
        if let Some(issuer) = &self.issuer {
            write!(out, " Issuer=\"")?;
            escape(issuer, out)?;
            out.write_char('"')?;
        }
        if self.must_be_present {
            write!(out, " MustBePresent=\"true\"")?;
        }
        writeln!(out, "/>")
    }
}

impl XmlEncode for AttributeSelector {
    fn encode(&self, out: &mut dyn Write, indenter: &mut Indenter) -> fmt::Result {
        indenter.pad(out)?;
        write!(out, "<AttributeSelector RequestContextPath=\"")?;
        escape(&self.context_path, out)?;
        write!(out, "\" DataType=\"{}\"", self.attr_type.identifier())?;
        if self.must_be_present {
            write!(out, " MustBePresent=\"true\"")?;
        }
        writeln!(out, "/>")
    }
}

impl XmlEncode for Apply {
    fn encode(&self, out: &mut dyn Write, indenter: &mut Indenter) -> fmt::Result {
        indenter.pad(out)?;
        writeln!(out, "<Apply FunctionId=\"{}\">", self.function().identifier())?;
        indenter.indent();
        for child in self.children() {
            child.encode(out, indenter)?;
        }
        indenter.unindent();
        indenter.pad(out)?;
        writeln!(out, "</Apply>")
    }
}

impl XmlEncode for Condition {
    fn encode(&self, out: &mut dyn Write, indenter: &mut Indenter) -> fmt::Result {
        indenter.pad(out)?;
        writeln!(out, "<Condition>")?;
        indenter.indent();
        self.root().encode(out, indenter)?;
        indenter.unindent();
        indenter.pad(out)?;
        writeln!(out, "</Condition>")
    }
}

impl XmlEncode for VariableReference {
    fn encode(&self, out: &mut dyn Write, indenter: &mut Indenter) -> fmt::Result {
        indenter.pad(out)?;
        write!(out, "<VariableReference VariableId=\"")?;
        escape(self.variable_id(), out)?;
        writeln!(out, "\"/>")
    }
}

impl XmlEncode for VariableDefinition {
    fn encode(&self, out: &mut dyn Write, indenter: &mut Indenter) -> fmt::Result {
        indenter.pad(out)?;
        write!(out, "<VariableDefinition VariableId=\"")?;
        escape(self.variable_id(), out)?;
        writeln!(out, "\">")?;
        indenter.indent();
        self.expression().encode(out, indenter)?;
        indenter.unindent();
        indenter.pad(out)?;
        writeln!(out, "</VariableDefinition>")
    }
}

impl XmlEncode for Expression {
    fn encode(&self, out: &mut dyn Write, indenter: &mut Indenter) -> fmt::Result {
        match self {
            Expression::Literal(v) => v.encode(out, indenter),
            Expression::Apply(a) => a.encode(out, indenter),
            Expression::Condition(c) => c.encode(out, indenter),
            Expression::VariableReference(r) => r.encode(out, indenter),
            Expression::Function(f) => {
                indenter.pad(out)?;
                writeln!(out, "<Function FunctionId=\"{}\"/>", f.identifier())
            }
            Expression::Designator(d) => d.encode(out, indenter),
            Expression::Selector(s) => s.encode(out, indenter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttrType;
    use crate::expression::AttributeCategory;
    use crate::factory::StandardFunctionFactory;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn string(s: &str) -> Expression {
        Expression::Literal(AttributeValue::String(s.to_string()))
    }

    #[test]
    fn test_attribute_value_encoding_escapes_text() {
        let v = AttributeValue::String("a<b&c".to_string());
        assert_eq!(
            v.to_xml(),
            "<AttributeValue DataType=\"http://www.w3.org/2001/XMLSchema#string\">a&lt;b&amp;c</AttributeValue>\n"
        );
    }

    #[test]
    fn test_apply_encoding_nests_and_indents() {
        let equal = StandardFunctionFactory::general()
            .create_function("urn:oasis:names:tc:xacml:1.0:function:string-equal")
            .unwrap();
        let apply = Apply::new(equal, vec![string("a"), string("b")]).unwrap();
        let expected = "\
<Apply FunctionId=\"urn:oasis:names:tc:xacml:1.0:function:string-equal\">
  <AttributeValue DataType=\"http://www.w3.org/2001/XMLSchema#string\">a</AttributeValue>
  <AttributeValue DataType=\"http://www.w3.org/2001/XMLSchema#string\">b</AttributeValue>
</Apply>
";
        assert_eq!(apply.to_xml(), expected);
    }

    #[test]
    fn test_condition_encoding() {
        let cond = Condition::new(Expression::Literal(AttributeValue::Boolean(true))).unwrap();
        let expected = "\
<Condition>
  <AttributeValue DataType=\"http://www.w3.org/2001/XMLSchema#boolean\">true</AttributeValue>
</Condition>
";
        assert_eq!(cond.to_xml(), expected);
    }

    #[test]
    fn test_designator_encoding() {
        let d = AttributeDesignator::new(
            AttributeCategory::Subject,
            AttrType::String,
            "urn:example:group",
        )
        .must_be_present();
        assert_eq!(
            Expression::Designator(d).to_xml(),
            "<SubjectAttributeDesignator AttributeId=\"urn:example:group\" DataType=\"http://www.w3.org/2001/XMLSchema#string\" MustBePresent=\"true\"/>\n"
        );
    }

    #[test]
    fn test_variable_nodes_encoding() {
        let def = VariableDefinition::new("dept", string("sales"));
        let expected = "\
<VariableDefinition VariableId=\"dept\">
  <AttributeValue DataType=\"http://www.w3.org/2001/XMLSchema#string\">sales</AttributeValue>
</VariableDefinition>
";
        assert_eq!(def.to_xml(), expected);

        let reference = VariableReference::with_definition(Arc::new(def));
        assert_eq!(
            reference.to_xml(),
            "<VariableReference VariableId=\"dept\"/>\n"
        );
    }

    #[test]
    fn test_function_node_encoding() {
        let f = StandardFunctionFactory::general()
            .create_function("urn:oasis:names:tc:xacml:1.0:function:string-equal")
            .unwrap();
        assert_eq!(
            Expression::Function(f).to_xml(),
            "<Function FunctionId=\"urn:oasis:names:tc:xacml:1.0:function:string-equal\"/>\n"
        );
    }
}
