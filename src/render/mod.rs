pub(crate) mod backend;
pub(crate) mod canvas;
pub(crate) mod fit;
pub(crate) mod native;
pub(crate) mod switch;
