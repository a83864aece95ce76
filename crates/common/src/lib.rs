// folio-common: shared page types and gateway protocol shapes for the Folio workspace

pub mod protocol;
pub mod types;
