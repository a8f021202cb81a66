pub(crate) mod band;
pub(crate) mod compositor;
pub(crate) mod gather;
pub(crate) mod many;
pub(crate) mod record;
pub(crate) mod serial;
pub(crate) mod single;
