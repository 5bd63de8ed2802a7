//! openEHR Reference Model (RM) 1.1.0 names used on the REST boundary.

pub mod constants;
