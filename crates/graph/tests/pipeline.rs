use coderag_graph::{
    analyze, derive, publish, DeriveOptions, GraphSnapshot, JsonSink, ModuleName, ProjectIndex,
    Relation, ResolveOptions, SourceOutline,
};
use coderag_parser::SourceParser;
use pretty_assertions::assert_eq;

fn outline(parser: &mut SourceParser, file: &str, module: &str, is_package: bool, code: &str) -> SourceOutline {
    let parsed = parser.parse(code, file).expect("parse");
    SourceOutline::collect(&parsed, file, ModuleName::new(module, is_package))
}

fn sources() -> Vec<SourceOutline> {
    let mut parser = SourceParser::new().expect("parser");
    vec![
        outline(
            &mut parser,
            "zoo/animals.py",
            "zoo.animals",
            false,
            r#"
class Animal:
    def speak(self):
        return self.sound()

    def sound(self):
        raise NotImplementedError


class Dog(Animal):
    def sound(self):
        return "woof"

    @classmethod
    def create(cls):
        return cls.build()

    @staticmethod
    def build():
        return Dog()
"#,
        ),
        outline(
            &mut parser,
            "zoo/keeper.py",
            "zoo.keeper",
            false,
            r#"
from .animals import *


def feed(animal):
    def chew():
        animal.speak()
    chew()
    return Dog.create()
"#,
        ),
    ]
}

#[test]
fn two_file_pipeline_links_definitions() {
    let outlines = sources();
    let index = ProjectIndex::build(&outlines);
    let options = ResolveOptions::default();

    let mut definitions = Vec::new();
    let mut calls = Vec::new();
    for outline in &outlines {
        let file_graph = analyze(outline, &index, &options);
        definitions.extend(file_graph.definitions);
        calls.extend(file_graph.calls);
    }
    let graph = derive(definitions, &calls, &DeriveOptions::default());

    assert_eq!(graph.node_count(), 9);
    assert!(graph.has_edge("zoo.animals.Animal.speak", "zoo.animals.Animal.sound", Relation::Call));
    assert!(graph.has_edge("zoo.animals.Dog", "zoo.animals.Animal", Relation::InheritsFrom));
    assert!(graph.has_edge("zoo.animals.Dog.create", "zoo.animals.Dog.build", Relation::Call));
    assert!(graph.has_edge("zoo.animals.Dog.build", "zoo.animals.Dog", Relation::Call));

    // wildcard import, nested function
    assert!(graph.has_edge("zoo.keeper.feed", "zoo.keeper.feed.chew", Relation::Call));
    assert!(graph.has_edge("zoo.keeper.feed.chew", "zoo.keeper.feed", Relation::NestedIn));
    assert!(graph.has_edge("zoo.keeper.feed", "zoo.animals.Dog", Relation::Call));
    assert!(graph.callees("zoo.keeper.feed.chew").is_empty());

    let subclasses: Vec<&str> = graph
        .subclasses("zoo.animals.Animal")
        .into_iter()
        .map(|d| d.id.as_str())
        .collect();
    assert_eq!(subclasses, vec!["zoo.animals.Dog"]);
}

#[test]
fn json_export_round_trips_through_snapshot() {
    let outlines = sources();
    let index = ProjectIndex::build(&outlines);
    let options = ResolveOptions::default();
    let file_graphs: Vec<_> = outlines
        .iter()
        .map(|outline| analyze(outline, &index, &options))
        .collect();
    let definitions = file_graphs.iter().flat_map(|g| g.definitions.clone()).collect();
    let calls: Vec<_> = file_graphs.iter().flat_map(|g| g.calls.clone()).collect();
    let graph = derive(definitions, &calls, &DeriveOptions::default());

    let mut sink = JsonSink::new(Vec::new());
    publish(&graph, &mut sink).expect("publish");
    let snapshot: GraphSnapshot = serde_json::from_slice(&sink.into_inner()).expect("json");

    assert_eq!(snapshot, GraphSnapshot::from_graph(&graph));
    assert_eq!(snapshot.edges.len(), graph.edge_count());
}
