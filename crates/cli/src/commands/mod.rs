pub(crate) mod eval;
pub(crate) mod parse;
pub(crate) mod select;
