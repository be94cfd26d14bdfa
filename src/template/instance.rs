//! Template instances - layout, sections, options and a bound data source

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};
use tracing::debug;

use super::context::{RenderContext, DATA_SOURCE_KEY, DOM_ID_KEY, DRAW_KEY, OPTION_KEY};
use super::dom::Document;
use super::events::{self, Event, EventEmitter, ListenerId};
use super::source::DataSource;
use crate::interpolate::{Interpolator, TagInterpolator};
use crate::section::{self, Layout, SectionContent, SectionTable};
use crate::RenderError;

/// Prefix of generated element identifiers
pub const DEFAULT_PREFIX: &str = "template";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Hook adding computed fields to the render context
pub type PrepareData = Rc<dyn Fn(&Template, &RenderContext) -> Map<String, Value>>;

/// Hook run after a successful redraw
pub type RenderedHook = Rc<dyn Fn(&Template)>;

/// A renderable template: one layout, a section table and options
pub struct Template {
    id: String,
    options: Map<String, Value>,
    layout: Layout,
    sections: SectionTable,
    data_source: Option<Rc<dyn DataSource>>,
    /// Listener registered on an observable data source
    subscription: Option<ListenerId>,
    events: Rc<EventEmitter>,
    draws: u64,
    prepare_data: Option<PrepareData>,
    rendered: Option<RenderedHook>,
    interpolator: Rc<dyn Interpolator>,
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}

impl Template {
    /// Create an empty template with a generated element id
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }

    /// Create an empty template whose element id starts with `prefix`
    pub fn with_prefix(prefix: &str) -> Self {
        let n = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("{}_{}", prefix, n),
            options: Map::new(),
            layout: Layout::default(),
            sections: SectionTable::new(),
            data_source: None,
            subscription: None,
            events: Rc::new(EventEmitter::new()),
            draws: 0,
            prepare_data: None,
            rendered: None,
            interpolator: Rc::new(TagInterpolator),
        }
    }

    /// Create a template seeded with sections and a layout
    pub fn with_parts<I, K, V>(sections: I, layout: impl Into<Layout>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<SectionContent>,
    {
        let mut template = Self::new();
        template.set_sections(sections).set_layout(layout);
        template
    }

    /// Element identifier, also used to namespace the draw counter
    pub fn dom_id(&self) -> &str {
        &self.id
    }

    pub fn set_dom_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.id = id.into();
        self
    }

    // Options

    /// Set one option, keeping the others
    pub fn option(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Merge several options; matching keys are overwritten
    pub fn merge_options(&mut self, options: Map<String, Value>) -> &mut Self {
        self.options.extend(options);
        self
    }

    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    pub fn get_option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    // Data source

    /// Bind a data source, releasing the previous one first.
    ///
    /// Events of an observable source are re-emitted on this template under
    /// the same name. Emits `connected`.
    pub fn connect(&mut self, source: Rc<dyn DataSource>) -> &mut Self {
        if self.is_connected() {
            self.disconnect();
        }

        if let Some(observable) = source.observable() {
            let target = Rc::downgrade(&self.events);
            let id = observable.subscribe(Rc::new(move |event: &Event| {
                if let Some(events) = target.upgrade() {
                    events.emit(&event.name, event.payload.clone());
                }
            }));
            self.subscription = Some(id);
        }
        self.data_source = Some(source);

        debug!(template = %self.id, observed = self.subscription.is_some(), "connected data source");
        self.events.emit(events::CONNECTED, None);
        self
    }

    /// Release the data source.
    ///
    /// Emits `before_disconnect` and `disconnected`. Returns false when
    /// nothing was connected.
    pub fn disconnect(&mut self) -> bool {
        let Some(source) = self.data_source.clone() else {
            return false;
        };

        self.events.emit(events::BEFORE_DISCONNECT, None);
        if let Some(id) = self.subscription.take() {
            if let Some(observable) = source.observable() {
                observable.unsubscribe(id);
            }
        }
        self.data_source = None;

        debug!(template = %self.id, "disconnected data source");
        self.events.emit(events::DISCONNECTED, None);
        true
    }

    pub fn data_source(&self) -> Option<&Rc<dyn DataSource>> {
        self.data_source.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.data_source.is_some()
    }

    // Layout and sections

    pub fn set_layout(&mut self, layout: impl Into<Layout>) -> &mut Self {
        self.layout = layout.into();
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Set one section; the name is stored upper-case
    pub fn set_section(&mut self, name: &str, content: impl Into<SectionContent>) -> &mut Self {
        self.sections.insert(name, content);
        self
    }

    /// Set several sections at once
    pub fn set_sections<I, K, V>(&mut self, sections: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<SectionContent>,
    {
        self.sections.extend(sections);
        self
    }

    pub fn sections(&self) -> &SectionTable {
        &self.sections
    }

    // Hooks

    /// Replace the hook computing extra render data
    pub fn set_prepare_data<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Template, &RenderContext) -> Map<String, Value> + 'static,
    {
        self.prepare_data = Some(Rc::new(hook));
        self
    }

    /// Replace the hook run after each successful redraw
    pub fn set_rendered<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Template) + 'static,
    {
        self.rendered = Some(Rc::new(hook));
        self
    }

    pub fn set_interpolator(&mut self, interpolator: Rc<dyn Interpolator>) -> &mut Self {
        self.interpolator = interpolator;
        self
    }

    /// Extra render data; empty unless a hook is set
    pub fn prepare_data(&self, context: &RenderContext) -> Map<String, Value> {
        match &self.prepare_data {
            Some(hook) => hook(self, context),
            None => Map::new(),
        }
    }

    // Events

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> ListenerId
    where
        F: Fn(&Event) + 'static,
    {
        self.events.on(event, handler)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    // Rendering

    /// Number of renders so far, `None` before the first one
    pub fn current_draw(&self) -> Option<u64> {
        (self.draws > 0).then_some(self.draws)
    }

    /// Build the context for a render without counting a draw.
    ///
    /// Layers, lowest priority first: options, data source, draw counter and
    /// element id; then [`Template::prepare_data`]; then `external` if it is a
    /// JSON object.
    pub fn render_context(&self, external: Option<&Value>) -> RenderContext {
        let mut context = RenderContext::new();
        context.insert(OPTION_KEY, Value::Object(self.options.clone()));
        context.insert(
            DATA_SOURCE_KEY,
            self.data_source
                .as_ref()
                .map_or(Value::Null, |source| source.snapshot()),
        );
        context.insert(DRAW_KEY, self.current_draw().map_or(Value::Null, Value::from));
        context.insert(DOM_ID_KEY, self.id.clone());

        let prepared = self.prepare_data(&context);
        context.merge(prepared);
        if let Some(data) = external {
            context.merge_value(data);
        }
        context
    }

    /// Render the layout with its sections and interpolate the result
    pub fn render(&mut self, external: Option<&Value>) -> Result<String, RenderError> {
        self.draws += 1;
        let context = self.render_context(external);

        let resolved = section::resolve(&self.layout, self, &self.sections, &context)?;
        let output = self
            .interpolator
            .interpolate(&resolved.text, &context)
            .map_err(|source| RenderError::Interpolate {
                source,
                text: resolved.text.clone(),
            })?;

        debug!(
            template = %self.id,
            draw = self.draws,
            missing = resolved.missing.len(),
            "rendered template"
        );
        Ok(output)
    }

    /// Markup currently mounted for this template
    pub fn dom<'d, D: Document + ?Sized>(&self, document: &'d D) -> Option<&'d str> {
        document.element(&self.id)
    }

    /// Render again and swap the result into `document`.
    ///
    /// Returns false without rendering when no element with this template's
    /// id is mounted, and false after rendering when the document does not
    /// take the new markup. Emits `re-draw`, then `drawn` with the new content
    /// once it is in place.
    pub fn re_draw<D: Document + ?Sized>(
        &mut self,
        document: &mut D,
        external: Option<&Value>,
    ) -> Result<bool, RenderError> {
        if !document.contains_element(&self.id) {
            return Ok(false);
        }

        let content = self.render(external)?;
        self.events.emit(events::RE_DRAW, None);
        if !document.replace_element(&self.id, content.clone()) {
            debug!(template = %self.id, "document refused the replacement");
            return Ok(false);
        }
        self.events.emit(events::DRAWN, Some(Value::String(content)));

        if let Some(hook) = self.rendered.clone() {
            hook(self);
        }
        Ok(true)
    }
}

impl Drop for Template {
    fn drop(&mut self) {
        if let (Some(source), Some(id)) = (&self.data_source, self.subscription.take()) {
            if let Some(observable) = source.observable() {
                observable.unsubscribe(id);
            }
        }
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("layout", &self.layout)
            .field("sections", &self.sections)
            .field("connected", &self.is_connected())
            .field("draws", &self.draws)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::template::{MemoryDocument, Store};

    fn event_log(template: &Template) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        template
            .events()
            .on_any(move |event| sink.borrow_mut().push(event.name.clone()));
        log
    }

    #[test]
    fn test_ids_are_unique_and_prefixed() {
        let a = Template::new();
        let b = Template::with_prefix("widget");
        assert_ne!(a.dom_id(), b.dom_id());
        assert!(a.dom_id().starts_with("template_"));
        assert!(b.dom_id().starts_with("widget_"));
    }

    #[test]
    fn test_options_merge() {
        let mut template = Template::new();
        template.option("a", 1).option("b", 2);
        let mut more = Map::new();
        more.insert("b".to_string(), json!(3));
        more.insert("c".to_string(), json!(4));
        template.merge_options(more);

        assert_eq!(Value::Object(template.options().clone()), json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn test_render_simple_layout() {
        let mut template = Template::with_parts([("header", "Hi")], "<div>@HEADER@</div>");
        assert_eq!(template.render(None).unwrap(), "<div>Hi</div>");
    }

    #[test]
    fn test_draw_counter_increments() {
        let mut template = Template::with_parts([("n", "<%= draw %>")], "#@N@");
        assert_eq!(template.current_draw(), None);
        assert_eq!(template.render(None).unwrap(), "#1");
        assert_eq!(template.render(None).unwrap(), "#2");
        assert_eq!(template.current_draw(), Some(2));
    }

    #[test]
    fn test_context_layering() {
        let mut template = Template::new();
        template.option("title", "from options");
        template.set_prepare_data(|_, context| {
            let mut extra = Map::new();
            extra.insert("greeting".to_string(), json!("prepared"));
            extra.insert("who".to_string(), json!(context.dom_id()));
            extra
        });

        let context = template.render_context(Some(&json!({"greeting": "external"})));
        assert_eq!(context.get_path("option.title"), Some(&json!("from options")));
        assert_eq!(context.get("greeting"), Some(&json!("external")));
        assert_eq!(context.get("who"), Some(&json!(template.dom_id())));
        assert_eq!(context.get(DATA_SOURCE_KEY), Some(&Value::Null));
        assert_eq!(context.get(DRAW_KEY), Some(&Value::Null));
    }

    #[test]
    fn test_external_data_wins_over_reserved_keys() {
        let mut template = Template::new();
        template.set_layout("<%= dom_id %>");
        let out = template.render(Some(&json!({"dom_id": "custom"}))).unwrap();
        assert_eq!(out, "custom");
    }

    #[test]
    fn test_layout_generator_sees_context_and_source() {
        let mut template = Template::new();
        template
            .connect(Rc::new(json!({"name": "Ann"})))
            .set_layout(SectionContent::generator(|_, source, context| {
                let name = source
                    .map(|s| s.snapshot()["name"].as_str().unwrap_or("").to_string())
                    .unwrap_or_default();
                format!("{} #{}", name, context.draw().unwrap_or(0))
            }));

        assert_eq!(template.render(None).unwrap(), "Ann #1");
    }

    #[test]
    fn test_data_source_in_interpolation() {
        let mut template = Template::new();
        template
            .connect(Rc::new(json!({"user": "bob"})))
            .set_layout("<p><%- data_source.user %></p>");
        assert_eq!(template.render(None).unwrap(), "<p>bob</p>");
    }

    #[test]
    fn test_connect_and_disconnect_events() {
        let mut template = Template::new();
        let log = event_log(&template);

        template.connect(Rc::new(json!({})));
        assert!(template.is_connected());
        assert!(template.disconnect());
        assert!(!template.is_connected());
        assert!(!template.disconnect());

        assert_eq!(*log.borrow(), vec!["connected", "before_disconnect", "disconnected"]);
    }

    #[test]
    fn test_reconnect_releases_previous_source() {
        let first = Rc::new(Store::new());
        let second = Rc::new(Store::new());
        let mut template = Template::new();
        let log = event_log(&template);

        template.connect(first.clone());
        template.connect(second.clone());

        assert_eq!(first.events().listener_count(), 0);
        assert_eq!(second.events().listener_count(), 1);
        assert_eq!(
            *log.borrow(),
            vec!["connected", "before_disconnect", "disconnected", "connected"]
        );
    }

    #[test]
    fn test_source_events_are_forwarded() {
        let store = Rc::new(Store::new());
        let mut template = Template::new();
        template.connect(store.clone());

        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        template.on("change", move |event| sink.borrow_mut().push(event.payload.clone()));

        store.set("count", 1);
        template.disconnect();
        store.set("count", 2);

        assert_eq!(*changes.borrow(), vec![Some(json!({"count": 1}))]);
    }

    #[test]
    fn test_drop_releases_subscription() {
        let store = Rc::new(Store::new());
        {
            let mut template = Template::new();
            template.connect(store.clone());
            assert_eq!(store.events().listener_count(), 1);
        }
        assert_eq!(store.events().listener_count(), 0);
    }

    #[test]
    fn test_re_draw_without_element() {
        let mut template = Template::with_parts([("a", "x")], "@A@");
        let mut doc = MemoryDocument::new();
        let log = event_log(&template);

        assert!(!template.re_draw(&mut doc, None).unwrap());
        assert_eq!(template.current_draw(), None);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_re_draw_replaces_element() {
        let mut template = Template::with_parts([("body", "<%= text %>")], "<p>@BODY@</p>");
        let mut doc = MemoryDocument::new();
        doc.mount(template.dom_id(), "<p>old</p>");

        let drawn = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&drawn);
        template.on(events::RE_DRAW, {
            let sink = Rc::clone(&sink);
            move |event: &Event| sink.borrow_mut().push(event.name.clone())
        });
        template.on(events::DRAWN, move |event| {
            sink.borrow_mut().push(format!("drawn {}", event.payload.clone().unwrap_or_default()));
        });
        let hook_calls = Rc::new(RefCell::new(0));
        let hook_sink = Rc::clone(&hook_calls);
        template.set_rendered(move |_| *hook_sink.borrow_mut() += 1);

        assert!(template.re_draw(&mut doc, Some(&json!({"text": "new"}))).unwrap());
        assert_eq!(template.dom(&doc), Some("<p>new</p>"));
        assert_eq!(*drawn.borrow(), vec!["re-draw", r#"drawn "<p>new</p>""#]);
        assert_eq!(*hook_calls.borrow(), 1);
    }

    /// Reports every element as present but never accepts new markup
    struct ReadOnlyDocument;

    impl Document for ReadOnlyDocument {
        fn element(&self, _id: &str) -> Option<&str> {
            Some("<p>frozen</p>")
        }

        fn replace_element(&mut self, _id: &str, _markup: String) -> bool {
            false
        }
    }

    #[test]
    fn test_re_draw_refused_replacement() {
        let mut template = Template::with_parts([("a", "x")], "@A@");
        let log = event_log(&template);
        let hook_calls = Rc::new(RefCell::new(0));
        let hook_sink = Rc::clone(&hook_calls);
        template.set_rendered(move |_| *hook_sink.borrow_mut() += 1);

        assert!(!template.re_draw(&mut ReadOnlyDocument, None).unwrap());
        assert_eq!(template.current_draw(), Some(1));
        assert_eq!(*log.borrow(), vec!["re-draw"]);
        assert_eq!(*hook_calls.borrow(), 0);
    }

    #[test]
    fn test_circular_sections_fail_render() {
        let mut template = Template::with_parts([("a", "@B@"), ("b", "@A@")], "@A@");
        let err = template.render(None).unwrap_err();
        assert!(matches!(err, RenderError::Section(_)));
    }
}
