// Functions are organized by the stage of the plotting pipeline they serve
pub mod classify;
pub mod implicit;
pub mod interval;
pub mod numeric;
pub mod plot;
pub mod relation_eval;
pub mod surface;
pub mod svg;
