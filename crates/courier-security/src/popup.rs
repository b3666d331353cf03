use url::Url;

/// Window name the login popup is opened under.
pub const POPUP_NAME: &str = "courier-google-login";

/// Outer geometry of the window the popup is centered over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFrame {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupFeatures {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
}

impl PopupFeatures {
    pub fn centered(frame: WindowFrame, width: u32, height: u32) -> Self {
        let offset = |outer: u32, inner: u32| ((i64::from(outer) - i64::from(inner)) / 2) as i32;
        Self {
            width,
            height,
            left: frame.x.saturating_add(offset(frame.width, width)),
            top: frame.y.saturating_add(offset(frame.height, height)),
        }
    }

    /// `window.open` style feature list.
    pub fn to_feature_string(&self) -> String {
        format!(
            "width={},height={},left={},top={}",
            self.width, self.height, self.left, self.top
        )
    }
}

pub trait PopupWindow: Send {
    fn focus(&mut self);
}

/// The environment able to open secondary windows.
pub trait WindowHost {
    fn frame(&self) -> WindowFrame;

    /// Open `url` in a new window; `None` means the host blocked it.
    fn open_popup(
        &self,
        url: &Url,
        name: &str,
        features: &PopupFeatures,
    ) -> Option<Box<dyn PopupWindow>>;
}
