pub mod panel_app;

pub use panel_app::CameraPanel;
