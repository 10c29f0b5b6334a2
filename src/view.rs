//! Пользовательская поверхность сессии: область логов, локальные превью,
//! поле с закодированным offer и кнопка захвата экрана.

use crate::peer::media::MediaStream;
use std::io::Write;
use std::sync::Mutex;

pub trait SessionView: Send + Sync {
    /// Дописать строку в область логов (без временных меток)
    fn append_log(&self, line: &str);

    /// Показать локальный поток, один элемент на поток
    fn render_stream(&self, stream: &MediaStream);

    fn set_local_session_description(&self, encoded: &str);

    fn local_session_description(&self) -> String;

    fn disable_display_capture(&self);

    fn display_capture_disabled(&self) -> bool;

    /// Блокирующее уведомление пользователя
    fn alert(&self, message: &str);
}

/// Поле offer и состояние кнопки захвата экрана, общие для всех видов
#[derive(Default)]
struct Fields(Mutex<FieldValues>);

#[derive(Default)]
struct FieldValues {
    local_session_description: String,
    display_capture_disabled: bool,
}

impl Fields {
    fn set_description(&self, encoded: &str) {
        if let Ok(mut f) = self.0.lock() {
            f.local_session_description = encoded.to_string();
        }
    }

    fn description(&self) -> String {
        self.0
            .lock()
            .map(|f| f.local_session_description.clone())
            .unwrap_or_default()
    }

    fn disable_capture(&self) {
        if let Ok(mut f) = self.0.lock() {
            f.display_capture_disabled = true;
        }
    }

    fn capture_disabled(&self) -> bool {
        self.0
            .lock()
            .map(|f| f.display_capture_disabled)
            .unwrap_or(false)
    }
}

/// Вывод в терминал
#[derive(Default)]
pub struct ConsoleView {
    fields: Fields,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionView for ConsoleView {
    fn append_log(&self, line: &str) {
        println!("{line}");
    }

    fn render_stream(&self, stream: &MediaStream) {
        println!(
            "[{:?}] stream {} ({})",
            stream.source,
            stream.id,
            stream.track_ids().join(", ")
        );
    }

    fn set_local_session_description(&self, encoded: &str) {
        self.fields.set_description(encoded);
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "----- local session description -----");
        let _ = writeln!(out, "{encoded}");
        let _ = writeln!(out, "--------------------------------------");
    }

    fn local_session_description(&self) -> String {
        self.fields.description()
    }

    fn disable_display_capture(&self) {
        self.fields.disable_capture();
    }

    fn display_capture_disabled(&self) -> bool {
        self.fields.capture_disabled()
    }

    fn alert(&self, message: &str) {
        eprintln!("ALERT: {message}");
    }
}

/// Запоминает всё, что показано пользователю
#[derive(Default)]
pub struct MemoryView {
    logs: Mutex<Vec<String>>,
    rendered: Mutex<Vec<String>>,
    alerts: Mutex<Vec<String>>,
    fields: Fields,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// id потоков в порядке отображения
    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl SessionView for MemoryView {
    fn append_log(&self, line: &str) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.push(line.to_string());
        }
    }

    fn render_stream(&self, stream: &MediaStream) {
        if let Ok(mut rendered) = self.rendered.lock() {
            rendered.push(stream.id.clone());
        }
    }

    fn set_local_session_description(&self, encoded: &str) {
        self.fields.set_description(encoded);
    }

    fn local_session_description(&self) -> String {
        self.fields.description()
    }

    fn disable_display_capture(&self) {
        self.fields.disable_capture();
    }

    fn display_capture_disabled(&self) -> bool {
        self.fields.capture_disabled()
    }

    fn alert(&self, message: &str) {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_view_records_fields() {
        let view = MemoryView::new();
        assert_eq!(view.local_session_description(), "");
        assert!(!view.display_capture_disabled());

        view.append_log("checking");
        view.set_local_session_description("abc");
        view.disable_display_capture();
        view.alert("boom");

        assert_eq!(view.logs(), vec!["checking"]);
        assert_eq!(view.local_session_description(), "abc");
        assert!(view.display_capture_disabled());
        assert_eq!(view.alerts(), vec!["boom"]);
    }

    #[test]
    fn console_view_keeps_offer_field_and_capture_state() {
        let view = ConsoleView::new();
        view.set_local_session_description("b2ZmZXI=");
        view.disable_display_capture();

        assert_eq!(view.local_session_description(), "b2ZmZXI=");
        assert!(view.display_capture_disabled());
    }
}
