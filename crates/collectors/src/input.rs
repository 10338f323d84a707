//! Input collector: form-field input/change capture with sensitive-field
//! masking, plus form submits.
//!
//! For a sensitive field the emitted record carries only the value length and
//! emptiness; the value itself never leaves the tab.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

use tracker_core::util::text::truncate_chars;
use tracker_core::{
    EventData, EventType, FieldType, FormSubmitData, InputConfig, InputData, PartialEvent,
};
use tracker_host::{InputKind, NodeId, Selector, Signal, SignalKind, Window};

use crate::base::{Collector, CollectorBase, EmitFn};
use crate::element::{
    element_info, is_ignored_by_attribute, matches_ignore_selectors, parse_ignore_selectors,
};

pub const INPUT_COLLECTOR: &str = "input";

struct InputShared {
    base: CollectorBase,
    config: InputConfig,
    sensitive_fields: Vec<String>,
    ignore_selectors: Vec<Selector>,
    // Serializes handler bodies so interleaved input/submit stay ordered.
    guard: Mutex<()>,
}

/// Collector for form input, change, and submit events.
pub struct InputCollector {
    shared: Arc<InputShared>,
}

impl InputCollector {
    pub fn new(config: InputConfig, sensitive_fields: Vec<String>, ignore_selectors: &[String]) -> Self {
        Self {
            shared: Arc::new(InputShared {
                base: CollectorBase::new(INPUT_COLLECTOR),
                config,
                sensitive_fields,
                ignore_selectors: parse_ignore_selectors(ignore_selectors),
                guard: Mutex::new(()),
            }),
        }
    }
}

impl Collector for InputCollector {
    fn name(&self) -> &'static str {
        INPUT_COLLECTOR
    }

    fn install(&self, window: &Window, emit: EmitFn) {
        if !self.shared.base.begin_install(window, emit) {
            return;
        }
        let shared = self.shared.clone();
        let win = window.clone();
        let id = window.add_listener(&[SignalKind::Input], move |signal| {
            if let Signal::Input { target, kind } = signal {
                shared.handle_input(&win, *target, *kind);
            }
        });
        self.shared.base.track_listener(id);

        if self.shared.config.track_form_submit {
            let shared = self.shared.clone();
            let win = window.clone();
            let id = window.add_listener(&[SignalKind::Submit], move |signal| {
                if let Signal::Submit { target } = signal {
                    shared.handle_submit(&win, *target);
                }
            });
            self.shared.base.track_listener(id);
        }
    }

    fn uninstall(&self) {
        self.shared.base.uninstall();
    }

    fn pause(&self) {
        self.shared.base.pause();
    }

    fn resume(&self) {
        self.shared.base.resume();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl InputShared {
    fn is_sensitive(&self, candidate: &str) -> bool {
        let lower = candidate.to_ascii_lowercase();
        self.sensitive_fields
            .iter()
            .any(|p| !p.is_empty() && lower.contains(&p.to_ascii_lowercase()))
    }

    fn handle_input(&self, window: &Window, target: NodeId, kind: InputKind) {
        if !self.base.is_active() {
            return;
        }
        let _guard = self.guard.lock();

        let (field_name, field_id, type_attr, field_type, value, ignored) = {
            let doc = window.document();
            if !matches!(doc.tag(target), "input" | "select" | "textarea") {
                return;
            }
            let ignored = is_ignored_by_attribute(&doc, target)
                || matches_ignore_selectors(&doc, target, &self.ignore_selectors);
            (
                doc.attr(target, "name").map(str::to_string),
                doc.id_attr(target).map(str::to_string),
                doc.attr(target, "type").map(str::to_string),
                FieldType::from_element(doc.tag(target), doc.attr(target, "type")),
                doc.value(target).to_string(),
                ignored,
            )
        };
        if ignored {
            return;
        }

        // Substring match against name, id, and type attribute; deliberate
        // over-capture (`user` also flags `username_hint`).
        let sensitive = [&field_name, &field_id, &type_attr]
            .into_iter()
            .flatten()
            .any(|candidate| self.is_sensitive(candidate));

        let value_length = value.chars().count();
        let is_empty = value.is_empty();
        let reported_value = if sensitive || !self.config.capture_values {
            None
        } else {
            Some(truncate_chars(&value, self.config.value_max_len))
        };

        let data = InputData {
            field_name: field_name.clone(),
            field_id,
            field_type,
            value: reported_value,
            value_length,
            is_empty,
            is_sensitive: sensitive,
        };

        let name = match &field_name {
            Some(n) => format!("input_{}", n),
            None => format!("input_{}", field_type.as_str()),
        };

        let kind_label = match kind {
            InputKind::Input => "input",
            InputKind::Change => "change",
        };

        self.base.emit(
            PartialEvent::new(EventType::Input, name)
                .with_data(EventData::Input(data))
                .with_target(element_info(window, target))
                .with_property("eventKind", serde_json::Value::String(kind_label.into())),
        );
    }

    fn handle_submit(&self, window: &Window, target: NodeId) {
        if !self.base.is_active() {
            return;
        }
        let _guard = self.guard.lock();

        let data = {
            let doc = window.document();
            if doc.tag(target) != "form" {
                return;
            }
            if is_ignored_by_attribute(&doc, target)
                || matches_ignore_selectors(&doc, target, &self.ignore_selectors)
            {
                return;
            }
            let field_count = doc
                .descendants(target)
                .iter()
                .filter(|&&n| matches!(doc.tag(n), "input" | "select" | "textarea"))
                .count();
            FormSubmitData {
                form_name: doc.attr(target, "name").map(str::to_string),
                form_id: doc.id_attr(target).map(str::to_string),
                field_count,
                action: doc.attr(target, "action").map(str::to_string),
                method: doc.attr(target, "method").map(str::to_string),
            }
        };

        self.base.emit(
            PartialEvent::new(EventType::FormSubmit, "form_submit")
                .with_data(EventData::FormSubmit(data))
                .with_target(element_info(window, target)),
        );
    }
}
