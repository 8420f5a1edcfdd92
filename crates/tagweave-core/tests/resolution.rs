//! Resolution behaviour over sample tag graphs: termination on cycles,
//! priority of direct tags, attachment order, bridges, and the cache.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tagweave_core::{AttrValue, Element, MethodRef, Resolver, Tag, TagModel, TypeName};
use tagweave_test_utils::fixtures::{
    self, BEANS, LISTEN, LISTEN_ALIAS, ON_PRIVATE, RecordingModel, tag_type, widget,
};

fn on_message() -> Element {
    Element::Method(MethodRef::new(fixtures::WIDGET, "on_message"))
}

/// Declares `app.Beans` and every listed tag type as meta-attachable, then
/// attaches each tag type's meta-tags in order.
fn meta_graph(edges: &[(&str, &[&str])]) -> tagweave_core::ProgramModel {
    let model = fixtures::empty_model();
    model.declare_tag_type(tagweave_core::TagTypeDecl::new(BEANS, fixtures::meta_scope()));
    for (id, tags) in edges {
        model.declare_tag_type(tagweave_core::TagTypeDecl::new(*id, fixtures::meta_scope()));
        for tag in *tags {
            model.declare_tag_type(tagweave_core::TagTypeDecl::new(*tag, fixtures::meta_scope()));
            model.attach(tag_type(id), Tag::new(*tag));
        }
    }
    model
}

/// E:[A, C], A:[C, D], C:[G], D:[H]; G and H both carry Beans.
///
/// From `app.E`, `app.C` is ignored inside `@app.A`, so Beans is found
/// through D and H. From `@app.A` alone, C comes first and yields G's tag.
fn shadowed_graph() -> tagweave_core::ProgramModel {
    let model = meta_graph(&[
        ("app.A", &["app.C", "app.D"][..]),
        ("app.C", &["app.G"][..]),
        ("app.D", &["app.H"][..]),
    ]);
    model.attach(tag_type("app.G"), Tag::new(BEANS).with_attr("via", "g"));
    model.attach(tag_type("app.H"), Tag::new(BEANS).with_attr("via", "h"));
    model.declare_type(tagweave_core::TypeDecl::new("app.E"));
    model.attach(TypeName::new("app.E"), Tag::new("app.A"));
    model.attach(TypeName::new("app.E"), Tag::new("app.C"));
    model
}

// ── Termination ───────────────────────────────────────────────────

#[test_log::test]
fn test_cycle_reaches_target_behind_it() {
    let resolver = Resolver::new(fixtures::cyclic_model());
    let found = resolver.resolve(&widget(), &tag_type("app.Target")).unwrap();
    assert_eq!(found.attr("depth"), Some(&AttrValue::Int(3)));
}

#[test_log::test]
fn test_cycle_without_target_terminates_empty() {
    let resolver = Resolver::new(fixtures::cyclic_model());
    assert!(resolver.resolve(&widget(), &tag_type("app.Unreachable")).is_none());
}

#[test]
fn test_cycle_never_searches_a_tag_type_twice() {
    let resolver = Resolver::new(RecordingModel::new(fixtures::cyclic_model()));
    assert!(resolver.resolve(&widget(), &tag_type("app.Unreachable")).is_none());

    // Each tag type is read at most once as a one-hop probe and once when
    // searched into.
    let model = resolver.model();
    assert_eq!(model.reads(&widget()), 1);
    assert!(model.max_reads() <= 2, "max reads {}", model.max_reads());
    for id in ["app.A", "app.B", "app.C"] {
        assert!(model.reads(&Element::TagType(tag_type(id))) >= 1, "{id} never read");
    }
}

#[test]
fn test_self_tagging_tag_type_terminates() {
    let model = fixtures::empty_model();
    model.declare_tag_type(tagweave_core::TagTypeDecl::new("app.Loop", fixtures::meta_scope()));
    model.declare_tag_type(tagweave_core::TagTypeDecl::new(BEANS, fixtures::meta_scope()));
    model.attach(tag_type("app.Loop"), Tag::new("app.Loop"));
    model.attach(widget(), Tag::new("app.Loop"));

    let resolver = Resolver::new(model);
    assert!(resolver.resolve(&widget(), &tag_type(BEANS)).is_none());
}

// ── Priority and ordering ─────────────────────────────────────────

#[test]
fn test_direct_tag_beats_meta_match_and_bridges() {
    let model = fixtures::ordered_meta_model();
    model.declare_tag_type(
        tagweave_core::TagTypeDecl::new(BEANS, fixtures::meta_scope())
            .with_forward("app.X", Default::default()),
    );
    model.attach(widget(), Tag::new(BEANS).with_attr("value", "direct"));

    let resolver = Resolver::new(model);
    let found = resolver.resolve(&widget(), &tag_type(BEANS)).unwrap();
    assert_eq!(found.attr("value"), Some(&AttrValue::from("direct")));

    let attached = resolver.model().tags_of(&widget());
    assert!(Arc::ptr_eq(&found, &attached[2]));
}

#[test]
fn test_first_candidate_in_attachment_order_wins() {
    let resolver = Resolver::new(fixtures::ordered_meta_model());
    let found = resolver.resolve(&widget(), &tag_type(BEANS)).unwrap();
    assert_eq!(found.attr("value"), Some(&AttrValue::from("app.X")));
}

#[test]
fn test_shallow_match_beats_deeper_match_on_earlier_candidate() {
    let model = fixtures::empty_model();
    for id in [BEANS, "app.Deep", "app.Mid", "app.Shallow"] {
        model.declare_tag_type(tagweave_core::TagTypeDecl::new(id, fixtures::meta_scope()));
    }
    // app.Deep reaches Beans two hops away; app.Shallow carries it directly.
    model.attach(tag_type("app.Mid"), Tag::new(BEANS).with_attr("value", "deep"));
    model.attach(tag_type("app.Deep"), Tag::new("app.Mid"));
    model.attach(tag_type("app.Shallow"), Tag::new(BEANS).with_attr("value", "shallow"));
    model.attach(widget(), Tag::new("app.Deep"));
    model.attach(widget(), Tag::new("app.Shallow"));

    let resolver = Resolver::new(model);
    let found = resolver.resolve(&widget(), &tag_type(BEANS)).unwrap();
    assert_eq!(found.attr("value"), Some(&AttrValue::from("shallow")));
}

#[test]
fn test_first_candidate_wins_when_both_match_only_deep() {
    // Widget carries [X, Y]; each reaches Beans two hops away.
    let model = meta_graph(&[
        ("app.X", &["app.XInner"][..]),
        ("app.Y", &["app.YInner"][..]),
    ]);
    model.attach(tag_type("app.XInner"), Tag::new(BEANS).with_attr("value", "x"));
    model.attach(tag_type("app.YInner"), Tag::new(BEANS).with_attr("value", "y"));
    model.attach(widget(), Tag::new("app.X"));
    model.attach(widget(), Tag::new("app.Y"));

    let resolver = Resolver::new(model);
    let found = resolver.resolve(&widget(), &tag_type(BEANS)).unwrap();
    assert_eq!(found.attr("value"), Some(&AttrValue::from("x")));
}

// ── Bridges ───────────────────────────────────────────────────────

#[test_log::test]
fn test_forward_bridge_converts_carrier() {
    let model = fixtures::bridge_model();
    model.attach(
        on_message(),
        Tag::new(LISTEN_ALIAS)
            .with_attr("value", "hello")
            .with_attr("unrelated", true),
    );

    let resolver = Resolver::new(model);
    let found = resolver.resolve(&on_message(), &tag_type(LISTEN)).unwrap();
    assert_eq!(found.tag_type, tag_type(LISTEN));
    assert_eq!(found.attr("value"), Some(&AttrValue::from("hello")));
    assert_eq!(found.attr("priority"), Some(&AttrValue::Int(0)));
    assert_eq!(found.attr("unrelated"), None);
}

#[test]
fn test_forward_bridge_needs_carrier_attached_directly() {
    let model = fixtures::bridge_model();
    // Method-only scope: no deep search, so the meta-level carrier is out of reach.
    model.declare_tag_type(
        tagweave_core::TagTypeDecl::new(LISTEN, tagweave_core::AttachmentScope::METHOD)
            .with_forward(LISTEN_ALIAS, Default::default()),
    );
    model.declare_tag_type(tagweave_core::TagTypeDecl::new(
        "app.Indirect",
        tagweave_core::AttachmentScope::METHOD,
    ));
    model.attach(tag_type("app.Indirect"), Tag::new(LISTEN_ALIAS));
    model.attach(on_message(), Tag::new("app.Indirect"));

    let resolver = Resolver::new(model);
    assert!(resolver.resolve(&on_message(), &tag_type(LISTEN)).is_none());
}

#[test]
fn test_bridge_applies_at_meta_level() {
    let model = fixtures::bridge_model();
    model.declare_tag_type(tagweave_core::TagTypeDecl::new(
        "app.Indirect",
        tagweave_core::AttachmentScope::METHOD,
    ));
    model.attach(
        tag_type("app.Indirect"),
        Tag::new(LISTEN_ALIAS).with_attr("value", "meta"),
    );
    model.attach(on_message(), Tag::new("app.Indirect"));

    let resolver = Resolver::new(model);
    let found = resolver.resolve(&on_message(), &tag_type(LISTEN)).unwrap();
    assert_eq!(found.attr("value"), Some(&AttrValue::from("meta")));
}

#[test_log::test]
fn test_reverse_bridge_converts_without_forward_bridge() {
    let model = fixtures::bridge_model();
    // Drop the forward bridge so only the reverse one can apply.
    model.declare_tag_type(
        tagweave_core::TagTypeDecl::new(
            LISTEN,
            tagweave_core::AttachmentScope::METHOD | tagweave_core::AttachmentScope::TAG_TYPE,
        )
        .with_default("value", ""),
    );
    model.attach(on_message(), Tag::new(ON_PRIVATE).with_attr("value", "dm"));

    let resolver = Resolver::new(model);
    let found = resolver.resolve(&on_message(), &tag_type(LISTEN)).unwrap();
    assert_eq!(found.tag_type, tag_type(LISTEN));
    assert_eq!(found.attr("value"), Some(&AttrValue::from("dm")));
}

#[test]
fn test_forward_bridge_preferred_over_reverse_bridge() {
    let model = fixtures::bridge_model();
    model.attach(on_message(), Tag::new(ON_PRIVATE).with_attr("value", "reverse"));
    model.attach(on_message(), Tag::new(LISTEN_ALIAS).with_attr("value", "forward"));

    let resolver = Resolver::new(model);
    let found = resolver.resolve(&on_message(), &tag_type(LISTEN)).unwrap();
    assert_eq!(found.attr("value"), Some(&AttrValue::from("forward")));
}

// ── Cache ─────────────────────────────────────────────────────────

#[test]
fn test_concurrent_resolution_caches_one_entry() {
    let resolver = Resolver::new(fixtures::cyclic_model());
    let target = tag_type("app.Target");

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| resolver.resolve(&widget(), &target)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let first = results[0].clone().unwrap();
    for result in &results {
        assert_eq!(result.as_deref(), Some(&*first));
    }
    let cached = resolver.cache().entries_for(&widget());
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].tag_type, target);
}

#[test]
fn test_cached_result_skips_traversal() {
    let resolver = Resolver::new(RecordingModel::new(fixtures::cyclic_model()));
    let target = tag_type("app.Target");
    assert!(resolver.resolve(&widget(), &target).is_some());

    resolver.model().reset();
    assert!(resolver.resolve(&widget(), &target).is_some());
    assert_eq!(resolver.model().total_reads(), 0);
}

#[test]
fn test_misses_are_not_cached() {
    let model = Arc::new(fixtures::bridge_model());
    let resolver = Resolver::new(Arc::clone(&model));
    assert!(resolver.resolve(&on_message(), &tag_type(LISTEN)).is_none());

    model.attach(on_message(), Tag::new(LISTEN_ALIAS));
    assert!(resolver.resolve(&on_message(), &tag_type(LISTEN)).is_some());
}

#[test]
fn test_clear_cache_reflects_model_changes() {
    let model = Arc::new(fixtures::ordered_meta_model());
    let resolver = Resolver::new(Arc::clone(&model));
    let beans = tag_type(BEANS);

    let before = resolver.resolve(&widget(), &beans).unwrap();
    assert_eq!(before.attr("value"), Some(&AttrValue::from("app.X")));

    model.detach_all(&widget());
    model.attach(widget(), Tag::new("app.Y"));

    // Still memoized until the cache is cleared.
    let stale = resolver.resolve(&widget(), &beans).unwrap();
    assert!(Arc::ptr_eq(&stale, &before));

    resolver.clear_cache();
    assert!(resolver.cache().is_empty());
    let after = resolver.resolve(&widget(), &beans).unwrap();
    assert_eq!(after.attr("value"), Some(&AttrValue::from("app.Y")));
}

#[test]
fn test_independent_resolvers_do_not_share_cache() {
    let first = Resolver::new(fixtures::ordered_meta_model());
    let second = Resolver::new(fixtures::ordered_meta_model());
    assert!(first.resolve(&widget(), &tag_type(BEANS)).is_some());
    assert!(!first.cache().is_empty());
    assert!(second.cache().is_empty());
}

#[test]
fn test_type_element_and_method_element_resolve_independently() {
    let model = fixtures::ordered_meta_model();
    let resolver = Resolver::new(model);
    let method = Element::Method(MethodRef::new(TypeName::new(fixtures::WIDGET), "make"));
    assert!(resolver.resolve(&method, &tag_type(BEANS)).is_none());
    assert!(resolver.resolve(&widget(), &tag_type(BEANS)).is_some());
}

#[test]
fn test_resolution_does_not_depend_on_earlier_calls() {
    let e = Element::Type(TypeName::new("app.E"));
    let a = Element::TagType(tag_type("app.A"));
    let beans = tag_type(BEANS);

    let fresh = Resolver::new(shadowed_graph());
    let from_a = fresh.resolve(&a, &beans).unwrap();
    assert_eq!(from_a.attr("via"), Some(&AttrValue::from("g")));
    assert_eq!(
        fresh.resolve(&e, &beans).unwrap().attr("via"),
        Some(&AttrValue::from("h"))
    );

    let warmed = Resolver::new(shadowed_graph());
    let from_e = warmed.resolve(&e, &beans).unwrap();
    assert_eq!(from_e.attr("via"), Some(&AttrValue::from("h")));
    assert_eq!(warmed.resolve(&a, &beans).as_deref(), Some(&*from_a));
}

#[test]
fn test_ignore_set_does_not_leak_into_later_resolution() {
    let e = Element::Type(TypeName::new("app.E"));
    let beans = tag_type(BEANS);
    let resolver = Resolver::new(shadowed_graph());

    let ignored: tagweave_core::IgnoreSet = [&tag_type("app.A")].into_iter().collect();
    let restricted = resolver.resolve_ignoring(&e, &beans, &ignored).unwrap();
    assert_eq!(restricted.attr("via"), Some(&AttrValue::from("g")));

    let full = resolver.resolve(&e, &beans).unwrap();
    assert_eq!(full.attr("via"), Some(&AttrValue::from("h")));
}
