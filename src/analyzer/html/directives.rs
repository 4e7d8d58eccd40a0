//! AngularJSディレクティブの分類（プレフィックス除去後の名前）

use phf::phf_set;

/// イベントハンドラ（呼び出しを含む式）
static EVENT_DIRECTIVES: phf::Set<&'static str> = phf_set! {
    "click", "dblclick",
    "change", "submit",
    "blur", "focus",
    "keydown", "keyup", "keypress",
    "mousedown", "mouseup", "mouseenter", "mouseleave", "mousemove", "mouseover",
    "copy", "cut", "paste",
};

/// 値がAngular式として評価されるディレクティブ
static EXPRESSION_DIRECTIVES: phf::Set<&'static str> = phf_set! {
    // データバインディング
    "bind", "bind-html", "model", "value", "init",
    // 条件・繰り返し
    "if", "show", "hide", "repeat", "switch",
    // スタイル・クラス
    "class", "style",
    // フォーム
    "disabled", "checked", "selected", "readonly", "required",
    // セレクト
    "options",
    // ng-messages
    "messages",
};

/// 参照抽出から除外する識別子（キーワード・組み込み）
static IGNORED_IDENTIFIERS: phf::Set<&'static str> = phf_set! {
    "true", "false", "null", "undefined", "NaN", "Infinity",
    "new", "typeof", "instanceof", "void", "delete", "in", "of",
    "if", "else", "return", "var", "let", "const", "function",
    "track", "by", "as",
    "$index", "$first", "$last", "$middle", "$odd", "$even",
    "$event", "$parent", "$root", "$id",
    "console", "window", "document",
    "Math", "JSON", "Array", "Object", "String", "Number", "Boolean", "Date",
    "parseInt", "parseFloat", "isNaN",
};

/// 呼び出し的なトークンを含むイベントディレクティブか
pub fn is_event_directive(name: &str) -> bool {
    EVENT_DIRECTIVES.contains(name)
}

pub fn is_expression_directive(name: &str) -> bool {
    EXPRESSION_DIRECTIVES.contains(name)
}

pub fn is_ignored_identifier(name: &str) -> bool {
    IGNORED_IDENTIFIERS.contains(name)
}
