// estport_core/src/estimation/filters/mod.rs

pub mod kalman;

pub use kalman::LinearKalmanFilter;
