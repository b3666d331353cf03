use courier_security::{PopupFeatures, PopupWindow, WindowFrame, WindowHost};
use url::Url;

/// Opens popups in the system browser, centered over the app window where the
/// browser honors it.
pub struct BrowserHost {
    frame: WindowFrame,
}

impl BrowserHost {
    pub fn new(frame: WindowFrame) -> Self {
        Self { frame }
    }

    pub fn from_viewport(ctx: &egui::Context) -> Self {
        let rect = ctx.input(|input| input.viewport().outer_rect);
        let frame = match rect {
            Some(rect) => WindowFrame {
                x: rect.min.x.round() as i32,
                y: rect.min.y.round() as i32,
                width: rect.width().max(0.0).round() as u32,
                height: rect.height().max(0.0).round() as u32,
            },
            None => WindowFrame {
                x: 0,
                y: 0,
                width: 960,
                height: 720,
            },
        };
        Self::new(frame)
    }
}

/// The browser owns the window; focus is handed to it on open.
struct BrowserPopup;

impl PopupWindow for BrowserPopup {
    fn focus(&mut self) {}
}

impl WindowHost for BrowserHost {
    fn frame(&self) -> WindowFrame {
        self.frame
    }

    fn open_popup(
        &self,
        url: &Url,
        name: &str,
        features: &PopupFeatures,
    ) -> Option<Box<dyn PopupWindow>> {
        tracing::info!(
            %url,
            name,
            features = %features.to_feature_string(),
            "opening login window"
        );
        match open::that(url.as_str()) {
            Ok(()) => Some(Box::new(BrowserPopup)),
            Err(err) => {
                tracing::warn!("system browser refused to open: {err}");
                None
            }
        }
    }
}
