use std::path::Path;

use rstest::rstest;

use super::{ScriptParse, ScriptParser};
use crate::config::AjsConfig;
use crate::error::AnalyzerError;
use crate::model::{SymbolKind, SymbolTable};

fn parse(source: &str) -> ScriptParse {
    ScriptParser::new(&AjsConfig::default())
        .parse(Path::new("/app/app.js"), source)
        .unwrap()
}

fn offset_of(source: &str, needle: &str) -> usize {
    source.find(needle).unwrap()
}

fn definitions(table: &SymbolTable, name: &str) -> Vec<(SymbolKind, usize)> {
    table
        .occurrences(name)
        .into_iter()
        .filter(|s| s.is_definition)
        .map(|s| (s.kind, s.offset))
        .collect()
}

fn references(table: &SymbolTable, name: &str) -> Vec<(SymbolKind, usize)> {
    table
        .occurrences(name)
        .into_iter()
        .filter(|s| !s.is_definition)
        .map(|s| (s.kind, s.offset))
        .collect()
}

#[test]
fn test_controller_with_shared_state() {
    let source = r#"app.controller("mainCtrl", function($scope){ $scope.title = "x"; $scope.save = function(){}; });"#;
    let result = parse(source);
    let table = &result.table;

    let controller = table.single(SymbolKind::Controller, "mainCtrl").unwrap();
    assert!(controller.is_definition);
    assert_eq!(controller.offset, offset_of(source, "mainCtrl"));

    assert_eq!(
        definitions(table, "title"),
        vec![(SymbolKind::Variable, offset_of(source, "title"))]
    );
    assert_eq!(
        definitions(table, "save"),
        vec![(SymbolKind::Function, offset_of(source, "save"))]
    );
    assert!(references(table, "save").is_empty());
}

#[rstest]
#[case("controller", SymbolKind::Controller)]
#[case("service", SymbolKind::Service)]
#[case("factory", SymbolKind::Service)]
#[case("directive", SymbolKind::Directive)]
#[case("component", SymbolKind::Component)]
#[case("filter", SymbolKind::Filter)]
fn test_registration_kinds(#[case] method: &str, #[case] kind: SymbolKind) {
    let source = format!("angular.module('app').{}('thing', function() {{}});", method);
    let table = parse(&source).table;
    assert_eq!(
        definitions(&table, "thing"),
        vec![(kind, offset_of(&source, "thing"))]
    );
}

#[test]
fn test_non_literal_registration_is_skipped() {
    let source = "var name = 'x'; app.controller(name, function() {}); items.filter(function(i) { return i; });";
    let table = parse(source).table;
    assert!(table.controllers.is_empty());
    assert!(table.filters.is_empty());
}

#[test]
fn test_shared_state_reads() {
    let source = r#"
app.controller('UserCtrl', function($scope) {
    $scope.user = {};
    $scope.user.name = 'a';
    $scope.load = function() {};
    $scope.load();
    console.log($scope.user.name);
    $scope.$watch('user', function() {});
});
"#;
    let table = parse(source).table;

    assert_eq!(definitions(&table, "user.name").len(), 1);
    // 代入の左辺 + console.log の引数
    let user_refs = references(&table, "user");
    assert_eq!(user_refs.len(), 2);
    assert_eq!(
        references(&table, "load"),
        vec![(SymbolKind::Function, offset_of(source, "load();"))]
    );
    assert_eq!(
        references(&table, "user.name"),
        vec![(SymbolKind::Variable, source.rfind("name);").unwrap())]
    );
    assert!(table.occurrences("$watch").is_empty());
}

#[test]
fn test_view_model_alias() {
    let source = r#"
function ListCtrl() {
    var self = this;
    self.count = 0;
    self.increment = () => { self.count++; };
}
"#;
    let table = parse(source).table;

    let aliases: Vec<_> = table
        .aliases()
        .map(|s| (s.name.as_str(), s.alias_for.as_deref()))
        .collect();
    assert_eq!(aliases, vec![("self", Some("this"))]);
    assert_eq!(
        definitions(&table, "count"),
        vec![(SymbolKind::Variable, offset_of(source, "count = 0"))]
    );
    assert_eq!(definitions(&table, "increment")[0].0, SymbolKind::Function);
    assert_eq!(references(&table, "count").len(), 1);
    assert_eq!(definitions(&table, "ListCtrl")[0].0, SymbolKind::Function);
}

#[test]
fn test_component_options() {
    let source = r#"
app.component('userList', {
    templateUrl: 'views/user-list.html',
    controllerAs: 'list',
    controller: function() {
        this.users = [];
    }
});
app.directive('userCard', function() {
    return { templateUrl: './user-card.html?v=2' };
});
"#;
    let result = parse(source);

    assert_eq!(
        result.template_urls,
        vec![
            "views/user-list.html".to_string(),
            "./user-card.html?v=2".to_string()
        ]
    );
    let alias = result
        .table
        .list(SymbolKind::Variable, "list")
        .first()
        .cloned()
        .unwrap();
    assert!(alias.is_definition);
    assert_eq!(alias.alias_for.as_deref(), Some("userList"));
    assert_eq!(alias.offset, offset_of(source, "list'"));
    assert_eq!(definitions(&result.table, "users")[0].0, SymbolKind::Variable);
}

#[test]
fn test_top_level_declarations() {
    let source = r#"
var helpers = {
    format: function(v) { return v; },
    parse(v) { return v; },
    urls: { base: '/api', nested: { deep: { deeper: 1 } } },
    version
};
const run = () => {};
function start() {
    var inner = function() {};
}
"#;
    let table = parse(source).table;

    assert_eq!(definitions(&table, "helpers")[0].0, SymbolKind::Variable);
    assert_eq!(definitions(&table, "helpers.format")[0].0, SymbolKind::Function);
    assert_eq!(definitions(&table, "helpers.parse")[0].0, SymbolKind::Function);
    assert_eq!(definitions(&table, "helpers.urls.base")[0].0, SymbolKind::Variable);
    assert_eq!(
        definitions(&table, "helpers.urls.nested.deep.deeper")[0].0,
        SymbolKind::Variable
    );
    assert_eq!(definitions(&table, "helpers.version")[0].0, SymbolKind::Variable);
    assert_eq!(definitions(&table, "run")[0].0, SymbolKind::Function);
    assert_eq!(definitions(&table, "start")[0].0, SymbolKind::Function);
    // 関数内の宣言はトップレベルではない
    assert!(table.occurrences("inner").is_empty());
}

#[test]
fn test_object_depth_is_bounded() {
    let source = "var a = { b: { c: { d: { e: { f: { g: { h: 1 } } } } } } };";
    let table = parse(source).table;
    assert!(!definitions(&table, "a.b.c.d.e.f.g").is_empty());
    assert!(definitions(&table, "a.b.c.d.e.f.g.h").is_empty());
}

#[rstest]
#[case("(function() { var util = function() {}; })();")]
#[case("(function() { var util = function() {}; }());")]
#[case("!function() { var util = function() {}; }();")]
#[case("(() => { function util() {} })();")]
fn test_iife_body_is_top_level(#[case] source: &str) {
    let table = parse(source).table;
    assert_eq!(definitions(&table, "util")[0].0, SymbolKind::Function);
}

#[test]
fn test_parse_is_idempotent() {
    let source = r#"app.controller('A', function($scope) { $scope.x = 1; $scope.f = function() {}; $scope.f(); });"#;
    let first = parse(source);
    let second = parse(source);
    assert_eq!(first.table, second.table);
}

#[test]
fn test_parse_into_shifts_offsets() {
    let parser = ScriptParser::new(&AjsConfig::default());
    let fragment = "$scope.title = 'x';";
    let mut table = SymbolTable::new("/app/index.html");
    parser.parse_into(fragment, 100, &mut table).unwrap();

    assert_eq!(
        definitions(&table, "title"),
        vec![(SymbolKind::Variable, 100 + offset_of(fragment, "title"))]
    );
}

#[test]
fn test_malformed_source_is_best_effort() {
    let source = "function ok() {}\nvar broken = ;\n";
    let table = parse(source).table;
    assert_eq!(definitions(&table, "ok")[0].0, SymbolKind::Function);
}

#[test]
fn test_parse_over_budget_is_timeout() {
    let mut config = AjsConfig::default();
    config.parse.timeout_ms = 1;
    let source = "$scope.items.push({ id: 1, name: 'x' });\n".repeat(200_000);

    let result = ScriptParser::new(&config).parse(Path::new("/app/huge.js"), &source);
    match result {
        Err(AnalyzerError::Timeout { path, budget_ms }) => {
            assert_eq!(path, Path::new("/app/huge.js"));
            assert_eq!(budget_ms, 1);
        }
        other => panic!("expected timeout, got {:?}", other.map(|p| p.table.len())),
    }
}
