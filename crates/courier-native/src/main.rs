mod host;
mod relay;

use anyhow::Context;
use courier_agent::{AuthListeners, CourierContext};
use courier_config::ConfigManager;
use courier_core::{EmailDraft, RenderStep, StageIcon, SubmissionState, WorkflowStatus};
use courier_security::{AuthSnapshot, KeychainStore, SessionStore, StoreWatcher};
use eframe::egui;
use host::BrowserHost;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let app = CourierApp::initialize().context("initialize Courier")?;

    let mut options = eframe::NativeOptions::default();
    options.viewport = egui::ViewportBuilder::default()
        .with_title("Courier")
        .with_inner_size([960.0, 720.0]);
    eframe::run_native(
        "Courier",
        options,
        Box::new(move |cc| {
            apply_theme(&cc.egui_ctx);
            Ok(Box::new(app))
        }),
    )
    .map_err(|err| anyhow::anyhow!(err.to_string()))
}

fn apply_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = egui::vec2(10.0, 10.0);
    style.spacing.button_padding = egui::vec2(12.0, 8.0);
    style.spacing.window_margin = egui::Margin::same(14);

    let mut visuals = egui::Visuals::dark();
    visuals.window_fill = egui::Color32::from_rgb(0x17, 0x2b, 0x46);
    visuals.panel_fill = egui::Color32::from_rgb(0x0a, 0x12, 0x20);
    visuals.widgets.active.bg_fill = egui::Color32::from_rgb(0x2b, 0xa5, 0x95);
    visuals.widgets.hovered.bg_stroke =
        egui::Stroke::new(1.0, egui::Color32::from_rgb(0x37, 0xbf, 0xae));
    visuals.selection.bg_fill = egui::Color32::from_rgb(0x2b, 0xa5, 0x95);

    style.visuals = visuals;
    ctx.set_style(style);
}

struct CourierApp {
    runtime: tokio::runtime::Runtime,
    context: CourierContext,
    submission: watch::Receiver<SubmissionState>,
    auth: watch::Receiver<AuthSnapshot>,
    instruction: String,
    auth_task: Option<JoinHandle<()>>,
    background: Vec<JoinHandle<()>>,
}

impl CourierApp {
    fn initialize() -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("build tokio runtime")?;

        let config_manager = ConfigManager::new().context("initialize config manager")?;
        let config = config_manager.load().context("load app config")?;
        let origin = config.service.origin().context("resolve service origin")?;

        let store: Arc<dyn SessionStore> = Arc::new(KeychainStore::for_origin(&origin));
        let context = CourierContext::with_http_client(&config, store.clone())
            .context("initialize courier context")?;

        let (auth_task, background) = {
            let _guard = runtime.enter();
            let AuthListeners {
                messages,
                storage,
                task,
            } = context.listen();

            let watcher = StoreWatcher::new(
                store,
                config.session.storage_key.clone(),
                Duration::from_millis(config.session.store_poll_interval_ms),
            );
            let mut background = vec![runtime.spawn(watcher.run(storage))];

            if config.relay.enabled {
                match runtime.block_on(tokio::net::TcpListener::bind(&config.relay.bind)) {
                    Ok(listener) => {
                        tracing::info!(bind = %config.relay.bind, "login relay listening");
                        background.push(runtime.spawn(async move {
                            if let Err(err) = relay::serve(listener, messages, origin).await {
                                tracing::warn!("login relay failed: {err:#}");
                            }
                        }));
                    }
                    Err(err) => {
                        tracing::warn!(bind = %config.relay.bind, "login relay unavailable: {err}")
                    }
                }
            }

            (task, background)
        };

        let submission = context.submissions().subscribe();
        let auth = context.auth().subscribe();
        let instruction = submission.borrow().instruction.clone();

        Ok(Self {
            runtime,
            context,
            submission,
            auth,
            instruction,
            auth_task: Some(auth_task),
            background,
        })
    }

    fn run_instruction(&self) {
        let submissions = self.context.submissions().clone();
        let instruction = self.instruction.clone();
        self.runtime.spawn(async move {
            submissions.submit(&instruction).await;
        });
    }

    fn connect(&self, ctx: &egui::Context) {
        let host = BrowserHost::from_viewport(ctx);
        if let Err(err) = self.context.auth().initiate_connect(&host) {
            tracing::debug!("connect did not start: {err}");
        }
    }

    fn show_account(&self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let auth = self.auth.borrow().clone();
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            match auth.identity.as_ref().and_then(|identity| {
                identity
                    .identity_email()
                    .map(|email| identity.name.clone().unwrap_or_else(|| email.to_string()))
            }) {
                Some(who) => {
                    ui.label(format!("Signed in as {who}"));
                }
                None => {
                    if ui.button("Connect Google").clicked() {
                        self.connect(ctx);
                    }
                }
            }
            if let Some(error) = &auth.error {
                ui.colored_label(egui::Color32::from_rgb(0xf2, 0x8b, 0x82), error);
            }
        });
    }
}

fn status_color(status: WorkflowStatus) -> egui::Color32 {
    match status {
        WorkflowStatus::Idle => egui::Color32::from_rgb(0x6b, 0x7f, 0x99),
        WorkflowStatus::InProgress => egui::Color32::from_rgb(0xf5, 0xc2, 0x4c),
        WorkflowStatus::Completed => egui::Color32::from_rgb(0x37, 0xbf, 0xae),
        WorkflowStatus::Error => egui::Color32::from_rgb(0xf2, 0x8b, 0x82),
    }
}

fn icon_glyph(icon: StageIcon) -> &'static str {
    match icon {
        StageIcon::Pencil => "✏",
        StageIcon::Sparkles => "✨",
        StageIcon::Send => "✉",
        StageIcon::CheckCircle => "✔",
    }
}

fn show_timeline(ui: &mut egui::Ui, steps: &[RenderStep]) {
    ui.columns(steps.len(), |columns| {
        for (column, step) in columns.iter_mut().zip(steps) {
            column.vertical_centered(|ui| {
                ui.label(
                    egui::RichText::new(icon_glyph(step.icon))
                        .size(22.0)
                        .color(status_color(step.status)),
                );
                ui.label(egui::RichText::new(step.label).strong());
                ui.colored_label(status_color(step.status), step.status.label());
                if let Some(detail) = &step.detail {
                    ui.label(egui::RichText::new(detail).small().weak());
                }
            });
        }
    });
}

fn show_draft(ui: &mut egui::Ui, draft: &EmailDraft) {
    ui.group(|ui| {
        ui.heading("Generated email");
        let to = match &draft.recipient_name {
            Some(name) => format!("{name} <{}>", draft.recipient_email),
            None => draft.recipient_email.clone(),
        };
        ui.label(format!("To: {to}"));
        ui.label(format!("Subject: {}", draft.subject));
        ui.separator();
        for line in draft.body_lines() {
            ui.label(line);
        }
    });
}

impl eframe::App for CourierApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.submission.has_changed().unwrap_or(false) {
            let state = self.submission.borrow_and_update();
            if state.instruction != self.instruction {
                self.instruction = state.instruction.clone();
            }
        }
        let state = self.submission.borrow().clone();

        egui::TopBottomPanel::top("top")
            .frame(
                egui::Frame::default()
                    .fill(ctx.style().visuals.panel_fill)
                    .inner_margin(egui::Margin::same(12)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Courier");
                    self.show_account(ui, ctx);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.label("What should Courier do?");
            let edit = ui.add(
                egui::TextEdit::multiline(&mut self.instruction)
                    .hint_text("e.g. Send a welcome email to john@example.com")
                    .desired_rows(3)
                    .desired_width(f32::INFINITY),
            );
            if edit.changed() {
                self.context.submissions().set_instruction(&self.instruction);
            }

            let can_run = !state.in_flight && !self.instruction.trim().is_empty();
            let label = if state.in_flight { "Running..." } else { "Run" };
            if ui.add_enabled(can_run, egui::Button::new(label)).clicked() {
                self.run_instruction();
            }

            ui.add_space(8.0);
            ui.separator();
            show_timeline(ui, &self.context.submissions().render_steps());

            ui.horizontal(|ui| {
                ui.label("Status:");
                ui.colored_label(
                    status_color(state.current_status),
                    state.current_status.label(),
                );
            });
            if let Some(error) = &state.last_error {
                ui.colored_label(status_color(WorkflowStatus::Error), error);
            }

            if let Some(draft) = &state.generated_email {
                ui.add_space(8.0);
                egui::ScrollArea::vertical().show(ui, |ui| show_draft(ui, draft));
            }
        });

        ctx.request_repaint_after(Duration::from_millis(200));
    }
}

impl Drop for CourierApp {
    fn drop(&mut self) {
        for task in self.background.drain(..) {
            task.abort();
        }
        if let Some(task) = self.auth_task.take() {
            self.runtime.block_on(async {
                if tokio::time::timeout(Duration::from_secs(1), task).await.is_err() {
                    tracing::warn!("auth listener did not detach in time");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_stage_draws_its_own_icon() {
        let glyphs: HashSet<_> = courier_core::workflow_template()
            .iter()
            .map(|entry| icon_glyph(entry.icon))
            .collect();
        assert_eq!(glyphs.len(), courier_core::workflow_template().len());
    }
}
