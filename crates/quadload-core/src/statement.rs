//! Statement model handed over by a statement source

use std::fmt;

/// XML Schema `anyURI`, used as the object type of IRI objects
pub const XSD_ANY_URI: &str = "http://www.w3.org/2001/XMLSchema#anyURI";

/// XML Schema `string`, the datatype of plain literals
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// RDF `langString`, the datatype of language-tagged literals
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// GeoSPARQL WKT literal datatype
pub const GEO_WKT_LITERAL: &str = "http://www.opengis.net/ont/geosparql#wktLiteral";

/// Object position of a statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Object {
    Iri(String),
    Literal { lexical: String, datatype: String },
}

impl Object {
    pub fn iri(value: impl Into<String>) -> Self {
        Self::Iri(value.into())
    }

    pub fn literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Literal {
            lexical: lexical.into(),
            datatype: datatype.into(),
        }
    }

    /// Plain `xsd:string` literal
    pub fn string(lexical: impl Into<String>) -> Self {
        Self::literal(lexical, XSD_STRING)
    }

    /// Stored value: the IRI itself or the literal's lexical form
    pub fn value(&self) -> &str {
        match self {
            Self::Iri(iri) => iri,
            Self::Literal { lexical, .. } => lexical,
        }
    }
}

/// A subject-predicate-object fact, optionally scoped to a named graph.
///
/// Statements are immutable once produced by the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    pub subject: String,
    pub predicate: String,
    pub object: Object,
    pub context: Option<String>,
}

impl Statement {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Object) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
            context: None,
        }
    }

    /// Scope the statement to a named graph
    pub fn in_graph(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Context IRI, or the empty string for the default graph
    pub fn context_str(&self) -> &str {
        self.context.as_deref().unwrap_or("")
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> <{}> ", self.subject, self.predicate)?;
        match &self.object {
            Object::Iri(iri) => write!(f, "<{iri}>")?,
            Object::Literal { lexical, datatype } => write!(f, "{lexical:?}^^<{datatype}>")?,
        }
        if let Some(ctx) = &self.context {
            write!(f, " <{ctx}>")?;
        }
        Ok(())
    }
}
