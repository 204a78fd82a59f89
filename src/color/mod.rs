//! CIE L*a*b* conversion and guide/color compositing.

pub(crate) mod composite;
pub(crate) mod lab;
