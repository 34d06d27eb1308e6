//! End-to-end scenarios against the in-memory host.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_template::{
    dispatch_event, html, repeat, Engine, EntityClass, Event, Listener, MemoryHost, NodeId,
    PropertyDefinition, PropertyValue, Runtime, SetOutcome, Strings, TemplateResult, Value,
    WriteOutcome,
};

fn item(label: &str) -> TemplateResult {
    html!("<li class=\"item ", label, "\">", label, "</li>")
}

fn list(keys: &[&'static str]) -> Value {
    repeat(keys.iter().copied(), |k| *k, item)
}

fn host_with_root() -> (MemoryHost, NodeId) {
    let mut host = MemoryHost::new();
    let root = host.create_element("ul");
    (host, root)
}

#[test]
fn test_idempotent_rerender_has_zero_mutations() {
    let engine = Engine::new();
    let (mut host, root) = host_with_root();
    let clicked = Listener::new(|_| {});
    let view = |n: i32, on: bool| {
        html!(
            "<section ?hidden=", !on, " .count=", n, " @click=", clicked.clone(), ">",
            list(&["a", "b"]), "<p>", n, "</p></section>"
        )
    };

    engine.render(&mut host, view(1, true), root).unwrap();
    host.reset_stats();
    engine.render(&mut host, view(1, true), root).unwrap();

    assert_eq!(host.stats().total(), 0, "second identical render must not touch the tree");
}

#[test]
fn test_descriptor_sharing() {
    let engine = Engine::new();
    let a = TemplateResult::new(Strings::owned(["<p>", "</p>"]), vec![Value::from(1)]);
    let b = TemplateResult::new(Strings::owned(["<p>", "</p>"]), vec![Value::from(2)]);
    let c = TemplateResult::new(Strings::owned(["<div>", "</div>"]), vec![Value::from(3)]);

    let da = engine.compile(&a).unwrap();
    let db = engine.compile(&b).unwrap();
    let dc = engine.compile(&c).unwrap();

    assert!(Rc::ptr_eq(&da, &db), "textually identical fragments share a descriptor");
    assert!(!Rc::ptr_eq(&da, &dc));
}

#[test]
fn test_primitive_node_noop() {
    let engine = Engine::new();
    let (mut host, root) = host_with_root();

    engine.render(&mut host, "same", root).unwrap();
    engine.render(&mut host, "same", root).unwrap();

    let stats = host.stats();
    assert_eq!(stats.texts_created + stats.text_writes, 1, "exactly one text write in total");
}

#[test]
fn test_state_preserving_reorder() {
    let engine = Engine::new();
    let (mut host, root) = host_with_root();

    engine.render(&mut host, list(&["A", "B", "C"]), root).unwrap();
    let before: Vec<NodeId> = engine
        .with_root(root, |p| p.children().iter().map(|c| c.start()).collect())
        .unwrap();
    host.reset_stats();

    engine.render(&mut host, list(&["C", "A", "B"]), root).unwrap();
    let after: Vec<NodeId> = engine
        .with_root(root, |p| p.children().iter().map(|c| c.start()).collect())
        .unwrap();

    assert_eq!(after, vec![before[2], before[0], before[1]], "same parts, new order");
    let stats = host.stats();
    assert_eq!(stats.range_moves, 1, "one move for a rotation");
    assert_eq!(stats.removals, 0);
    assert_eq!(stats.templates_cloned, 0);
    assert_eq!(
        host.to_html(root),
        "<li class=\"item C\">C</li><li class=\"item A\">A</li><li class=\"item B\">B</li>"
    );
}

#[test]
fn test_removal_cleanup() {
    let engine = Engine::new();
    let (mut host, root) = host_with_root();

    engine.render(&mut host, list(&["A", "B", "C"]), root).unwrap();
    host.reset_stats();
    engine.render(&mut host, list(&["A", "C"]), root).unwrap();

    let stats = host.stats();
    assert_eq!(stats.removals, 3, "B's start marker, <li> and end marker");
    assert_eq!(stats.total(), stats.removals, "A and C are not re-committed");
    assert_eq!(
        host.to_html(root),
        "<li class=\"item A\">A</li><li class=\"item C\">C</li>"
    );
}

#[test]
fn test_end_to_end_text_update() {
    let engine = Engine::new();
    let (mut host, root) = host_with_root();
    let result = TemplateResult::new(Strings::owned(["<a>", "</a>"]), vec![Value::from("hello")]);
    let descriptor = engine.compile(&result).unwrap();
    let mut instance = engine.materialize_into(&mut host, &descriptor, root, None).unwrap();

    engine
        .update(&mut host, &mut instance, vec![Value::from("hello")])
        .unwrap();
    engine
        .update(&mut host, &mut instance, vec![Value::from("world")])
        .unwrap();

    assert_eq!(host.to_html(root), "<a>world</a>");
    let text = instance.node_part(0).and_then(|p| p.text_node()).unwrap();
    assert_eq!(host.text(text), Some("world"));
    assert_eq!(host.stats().texts_created, 1);
    assert_eq!(host.stats().text_writes, 1);
}

// =============================================================================
// Reactive entities
// =============================================================================

struct App {
    host: Rc<RefCell<MemoryHost>>,
    runtime: Runtime,
}

impl App {
    fn new() -> Self {
        let host = Rc::new(RefCell::new(MemoryHost::new()));
        let runtime = Runtime::new(host.clone());
        Self { host, runtime }
    }

    fn element(&self, tag: &str) -> NodeId {
        self.host.borrow_mut().create_element(tag)
    }
}

#[test]
fn test_coalesced_scheduling() {
    let app = App::new();
    let renders = Rc::new(Cell::new(0));
    let counter = renders.clone();
    let class = EntityClass::builder("card")
        .declare_property("a", PropertyDefinition::new(0))
        .declare_property("b", PropertyDefinition::new(0))
        .declare_property("c", PropertyDefinition::new(0))
        .template(move |e| {
            counter.set(counter.get() + 1);
            Ok(html!("<p>", e.get("a")?, "", e.get("b")?, "", e.get("c")?, "</p>"))
        })
        .build();
    let el = app.element("x-card");
    let entity = app.runtime.mount(&class, el).unwrap();
    app.runtime.flush().unwrap();
    renders.set(0);

    entity.set("a", 1).unwrap();
    entity.set("b", 2).unwrap();
    entity.set("c", 3).unwrap();
    app.runtime.flush().unwrap();

    assert_eq!(renders.get(), 1, "three writes, one render");
    assert_eq!(app.host.borrow().to_html(el), "<p>123</p>");
}

#[test]
fn test_dependency_propagation_timing() {
    let app = App::new();
    let source_class = EntityClass::builder("source")
        .declare_property("p", PropertyDefinition::new("x"))
        .template(|e| Ok(html!("<b>", e.get("p")?, "</b>")))
        .build();
    let y = app.runtime.mount(&source_class, app.element("y")).unwrap();

    let y_for_x = y.clone();
    let dependent_class = EntityClass::builder("dependent")
        .template(move |_| Ok(html!("<i>", y_for_x.get("p")?, "</i>")))
        .build();
    let x_el = app.element("x");
    let x = app.runtime.mount(&dependent_class, x_el).unwrap();
    x.depends_on(&y, &["p"]).unwrap();
    app.runtime.flush().unwrap();

    y.set("p", "z").unwrap();
    let first = app.runtime.tick();
    assert_eq!(first.rendered, vec![y.id()], "source renders in the current checkpoint");
    assert_eq!(app.host.borrow().to_html(x_el), "<i>x</i>");

    let second = app.runtime.tick();
    assert_eq!(second.rendered, vec![x.id()], "dependent renders one checkpoint later");
    assert_eq!(app.host.borrow().to_html(x_el), "<i>z</i>");
    assert!(app.runtime.is_idle());
}

#[test]
fn test_dependency_timing_for_writes_during_a_checkpoint() {
    let app = App::new();
    let source_class = EntityClass::builder("source")
        .declare_property("p", PropertyDefinition::new("x"))
        .template(|e| Ok(html!("<b>", e.get("p")?, "</b>")))
        .build();
    let y = app.runtime.mount(&source_class, app.element("y")).unwrap();

    let y_for_x = y.clone();
    let dependent_class = EntityClass::builder("dependent")
        .template(move |_| Ok(html!("<i>", y_for_x.get("p")?, "</i>")))
        .build();
    let x = app.runtime.mount(&dependent_class, app.element("x")).unwrap();
    x.depends_on(&y, &["p"]).unwrap();
    app.runtime.flush().unwrap();

    let y_for_z = y.clone();
    let writer_class = EntityClass::builder("writer")
        .did_render(move |_| {
            let _ = y_for_z.set("p", "z");
        })
        .build();
    let z = app.runtime.mount(&writer_class, app.element("z")).unwrap();

    let writing = app.runtime.tick();
    assert_eq!(writing.rendered, vec![z.id()]);

    let source = app.runtime.tick();
    assert_eq!(source.rendered, vec![y.id()], "source renders without its dependent");

    let dependent = app.runtime.tick();
    assert_eq!(dependent.rendered, vec![x.id()], "dependent renders one checkpoint later");
    assert!(app.runtime.is_idle());
}

#[test]
fn test_transform_suppression() {
    let app = App::new();
    let effects = Rc::new(Cell::new(0));
    let effect_count = effects.clone();
    let class = EntityClass::builder("bounded")
        .declare_property(
            "percent",
            PropertyDefinition::new(50)
                .write_transform(|_, value, _| match value.as_int() {
                    Some(v) if (0..=100).contains(&v) => WriteOutcome::Accept(value),
                    _ => WriteOutcome::Suppress,
                })
                .side_effect(move |_, _, _| {
                    effect_count.set(effect_count.get() + 1);
                    Ok(())
                }),
        )
        .build();
    let entity = app.runtime.mount(&class, app.element("x-bar")).unwrap();
    app.runtime.flush().unwrap();

    let outcome = entity.set("percent", 250).unwrap();

    assert_eq!(outcome, SetOutcome::Suppressed);
    assert_eq!(entity.get("percent").unwrap(), PropertyValue::from(50));
    assert_eq!(effects.get(), 0, "no side effect");
    assert!(app.runtime.is_idle(), "no render scheduled");
}

#[test]
fn test_event_handler_writes_property() {
    let app = App::new();
    let class = EntityClass::builder("clicker")
        .declare_property("clicks", PropertyDefinition::new(0))
        .template(|e| {
            let target = e.clone();
            let on_click = Listener::new(move |_| {
                let n = target.get("clicks").ok().and_then(|v| v.as_int()).unwrap_or(0);
                let _ = target.set("clicks", n + 1);
            });
            Ok(html!("<button @click=", on_click, ">", e.get("clicks")?, "</button>"))
        })
        .build();
    let el = app.element("x-clicker");
    app.runtime.mount(&class, el).unwrap();
    app.runtime.flush().unwrap();

    let button = app.host.borrow().content_children(el)[0];
    dispatch_event(&app.host, &Event::new("click", button));
    dispatch_event(&app.host, &Event::new("click", button));
    app.runtime.flush().unwrap();

    assert_eq!(app.host.borrow().to_html(el), "<button>2</button>");
    assert_eq!(
        app.host.borrow().listeners(button, "click").len(),
        1,
        "re-rendered handlers reuse one host registration"
    );
}
