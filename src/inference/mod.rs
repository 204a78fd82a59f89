//! Generator seam: the model call that turns a guide into a low-resolution color frame.

pub(crate) mod generator;
pub(crate) mod grade;
pub(crate) mod tensor;
