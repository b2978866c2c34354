pub mod edf_error;
