use indexmap::IndexMap;

/// Name-keyed dictionary, iterated in insertion order.
pub type OperandMap = IndexMap<Vec<u8>, Operand>;

/// An operand of a content-stream operator.
///
/// Arrays and dictionaries nest operands only, so an operator can never end up
/// inside a composite value.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Name bytes without the leading `/`, escapes already decoded.
    Name(Vec<u8>),
    Boolean(bool),
    Integer(i64),
    Real(f32),
    /// Raw string bytes, whether the source was a literal or a hex string.
    String(Vec<u8>),
    Array(Vec<Operand>),
    Dictionary(OperandMap),
}

/// Parameters and payload of a `BI` ... `ID` ... `EI` block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InlineImage {
    pub params: OperandMap,
    /// Opaque image bytes between `ID` and `EI`.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Named(String),
    InlineImage(InlineImage),
}

/// One element of a flat content-stream token sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Operand(Operand),
    Operator(Operator),
}

impl Operand {
    pub fn name(name: impl Into<Vec<u8>>) -> Self {
        Operand::Name(name.into())
    }

    pub fn string(bytes: impl Into<Vec<u8>>) -> Self {
        Operand::String(bytes.into())
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Boolean(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Integer(value)
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Integer(value.into())
    }
}

impl From<f32> for Operand {
    fn from(value: f32) -> Self {
        Operand::Real(value)
    }
}

impl From<Vec<Operand>> for Operand {
    fn from(value: Vec<Operand>) -> Self {
        Operand::Array(value)
    }
}

impl From<OperandMap> for Operand {
    fn from(value: OperandMap) -> Self {
        Operand::Dictionary(value)
    }
}

impl InlineImage {
    pub fn new(params: OperandMap, data: impl Into<Vec<u8>>) -> Self {
        InlineImage { params, data: data.into() }
    }
}

impl Token {
    pub fn operand(value: impl Into<Operand>) -> Self {
        Token::Operand(value.into())
    }

    pub fn name(name: impl Into<Vec<u8>>) -> Self {
        Token::Operand(Operand::name(name))
    }

    pub fn string(bytes: impl Into<Vec<u8>>) -> Self {
        Token::Operand(Operand::string(bytes))
    }

    pub fn operator(name: impl Into<String>) -> Self {
        Token::Operator(Operator::Named(name.into()))
    }

    pub fn inline_image(image: InlineImage) -> Self {
        Token::Operator(Operator::InlineImage(image))
    }
}

impl From<Operand> for Token {
    fn from(value: Operand) -> Self {
        Token::Operand(value)
    }
}

impl From<Operator> for Token {
    fn from(value: Operator) -> Self {
        Token::Operator(value)
    }
}
