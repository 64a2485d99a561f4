//! Builtin core classes.
//!
//! A compact subset of the core library, enough to type ordinary programs:
//! the object hierarchy, numbers, strings, symbols, collections, ranges,
//! procs and exceptions.

use crate::sig::builder::EnvironmentBuilder;

const EXCEPTIONS: &[(&str, &str)] = &[
    ("ScriptError", "Exception"),
    ("StandardError", "Exception"),
    ("RuntimeError", "StandardError"),
    ("ArgumentError", "StandardError"),
    ("TypeError", "StandardError"),
    ("NameError", "StandardError"),
    ("NoMethodError", "NameError"),
    ("IndexError", "StandardError"),
    ("KeyError", "IndexError"),
    ("StopIteration", "IndexError"),
    ("ZeroDivisionError", "StandardError"),
    ("NotImplementedError", "ScriptError"),
];

pub(crate) fn add_core(builder: EnvironmentBuilder) -> EnvironmentBuilder {
    let builder = object_hierarchy(builder);
    let builder = numbers(builder);
    let builder = text(builder);
    let builder = collections(builder);
    let builder = misc(builder);
    EXCEPTIONS.iter().fold(builder, |b, (name, sup)| b.class(name, |c| c.superclass(sup)))
}

fn object_hierarchy(b: EnvironmentBuilder) -> EnvironmentBuilder {
    b.alias("boolish", "top")
        .interface("_ToS", |i| i.method("to_s", "() -> String"))
        .interface("_ToStr", |i| i.method("to_str", "() -> String"))
        .interface("_ToInt", |i| i.method("to_int", "() -> Integer"))
        .interface("_ToA[T]", |i| i.method("to_a", "() -> Array[T]"))
        .interface("_ToAry[T]", |i| i.method("to_ary", "() -> Array[T]"))
        .interface("_Each[T]", |i| i.method("each", "() { (T) -> void } -> void"))
        .class("BasicObject", |c| {
            c.method("!", "() -> bool")
                .method("==", "(untyped) -> bool")
                .method("!=", "(untyped) -> bool")
                .method("equal?", "(untyped) -> bool")
                .method("instance_eval", "[U] () { (self) [self: self] -> U } -> U")
                .method("__id__", "() -> Integer")
                .private_method("initialize", "() -> void")
        })
        .class("Object", |c| c.superclass("BasicObject").include("Kernel"))
        .module("Kernel", |m| {
            m.pure_method("is_a?", "(Module) -> bool")
                .pure_method("kind_of?", "(Module) -> bool")
                .pure_method("instance_of?", "(Module) -> bool")
                .pure_method("nil?", "() -> bool")
                .pure_method("frozen?", "() -> bool")
                .pure_method("class", "() -> class")
                .method("===", "(untyped) -> bool")
                .method("=~", "(untyped) -> nil")
                .method("to_s", "() -> String")
                .method("inspect", "() -> String")
                .method("hash", "() -> Integer")
                .method("object_id", "() -> Integer")
                .method("freeze", "() -> self")
                .method("dup", "() -> self")
                .method("clone", "() -> self")
                .method("itself", "() -> self")
                .method("tap", "() { (self) -> void } -> self")
                .method("then", "[X] () { (self) -> X } -> X")
                .method("respond_to?", "(Symbol | String, ?bool) -> bool")
                .method("send", "(Symbol | String, *untyped) -> untyped")
                .method("public_send", "(Symbol | String, *untyped) -> untyped")
                .method("instance_variable_get", "(Symbol | String) -> untyped")
                .method("instance_variable_set", "[X] (Symbol | String, X) -> X")
                .method("instance_variables", "() -> Array[Symbol]")
                .method("methods", "() -> Array[Symbol]")
                .method("display", "() -> nil")
                .private_method("puts", "(*untyped) -> nil")
                .private_method("print", "(*untyped) -> nil")
                .private_method("p", "() -> nil | [T] (T) -> T | (untyped, untyped, *untyped) -> Array[untyped]")
                .private_method("pp", "[T] (T) -> T")
                .private_method("format", "(String, *untyped) -> String")
                .private_method("sprintf", "(String, *untyped) -> String")
                .private_method("gets", "() -> String?")
                .private_method(
                    "raise",
                    "() -> bot | (String) -> bot | (singleton(Exception), ?String) -> bot | (Exception) -> bot",
                )
                .private_method(
                    "fail",
                    "() -> bot | (String) -> bot | (singleton(Exception), ?String) -> bot | (Exception) -> bot",
                )
                .private_method("exit", "(?Integer | bool) -> bot")
                .private_method("abort", "(?String) -> bot")
                .private_method("loop", "() { () -> void } -> bot")
                .private_method("lambda", "() { (*untyped) -> untyped } -> Proc")
                .private_method("proc", "() { (*untyped) -> untyped } -> Proc")
                .private_method("block_given?", "() -> bool")
                .private_method("require", "(String) -> bool")
                .private_method("require_relative", "(String) -> bool")
                .private_method("sleep", "(?Integer | Float) -> Integer")
                .private_method("rand", "() -> Float | (Integer) -> Integer | (Range[Integer]) -> Integer")
                .private_method("Integer", "(untyped, ?Integer) -> Integer")
                .private_method("Float", "(untyped) -> Float")
                .private_method("String", "(untyped) -> String")
                .private_method("Array", "(untyped) -> Array[untyped]")
                .private_method("catch", "[T] (?untyped) { (untyped) -> T } -> untyped")
                .private_method("throw", "(untyped, ?untyped) -> bot")
                .private_method("binding", "() -> untyped")
                .private_method("caller", "() -> Array[String]")
                .private_method("at_exit", "() { () -> void } -> Proc")
        })
        .module("Comparable", |m| {
            m.method("<", "(untyped) -> bool")
                .method("<=", "(untyped) -> bool")
                .method(">", "(untyped) -> bool")
                .method(">=", "(untyped) -> bool")
                .method("between?", "(untyped, untyped) -> bool")
                .method("clamp", "(untyped, untyped) -> self")
        })
        .class("Module", |c| {
            c.pure_method("name", "() -> String?")
                .method("===", "(untyped) -> bool")
                .method("==", "(untyped) -> bool")
                .method("<", "(Module) -> bool?")
                .method("<=", "(Module) -> bool?")
                .method("ancestors", "() -> Array[Module]")
                .method("instance_methods", "(?bool) -> Array[Symbol]")
                .method("method_defined?", "(Symbol | String) -> bool")
                .method("const_get", "(Symbol | String) -> untyped")
                .method("to_s", "() -> String")
                .private_method("attr_reader", "(*Symbol | String) -> Array[Symbol]")
                .private_method("attr_writer", "(*Symbol | String) -> Array[Symbol]")
                .private_method("attr_accessor", "(*Symbol | String) -> Array[Symbol]")
                .private_method("include", "(*Module) -> self")
                .private_method("extend", "(*Module) -> self")
                .private_method("prepend", "(*Module) -> self")
                .private_method("private", "(*Symbol) -> nil")
                .private_method("public", "(*Symbol) -> nil")
                .private_method("protected", "(*Symbol) -> nil")
                .private_method("module_function", "(*Symbol) -> nil")
                .private_method("define_method", "(Symbol | String) { (*untyped) -> untyped } -> Symbol")
        })
        .class("Class", |c| {
            c.superclass("Module")
                .method("superclass", "() -> Class?")
                .method("allocate", "() -> untyped")
        })
}

fn numbers(b: EnvironmentBuilder) -> EnvironmentBuilder {
    b.class("Numeric", |c| {
        c.include("Comparable")
            .method("+", "(Numeric) -> Numeric")
            .method("-", "(Numeric) -> Numeric")
            .method("*", "(Numeric) -> Numeric")
            .method("/", "(Numeric) -> Numeric")
            .method("<=>", "(untyped) -> Integer?")
            .method("-@", "() -> Numeric")
            .method("+@", "() -> Numeric")
            .pure_method("zero?", "() -> bool")
            .pure_method("positive?", "() -> bool")
            .pure_method("negative?", "() -> bool")
            .pure_method("integer?", "() -> bool")
            .method("abs", "() -> Numeric")
            .method("to_i", "() -> Integer")
            .method("to_f", "() -> Float")
            .method("coerce", "(Numeric) -> [Numeric, Numeric]")
    })
    .class("Integer", |c| {
        c.superclass("Numeric")
            .method("+", "(Integer) -> Integer | (Float) -> Float")
            .method("-", "(Integer) -> Integer | (Float) -> Float")
            .method("*", "(Integer) -> Integer | (Float) -> Float")
            .method("/", "(Integer) -> Integer | (Float) -> Float")
            .method("%", "(Integer) -> Integer | (Float) -> Float")
            .method("**", "(Integer) -> Integer | (Float) -> Float")
            .method("<", "(Integer | Float) -> bool")
            .method("<=", "(Integer | Float) -> bool")
            .method(">", "(Integer | Float) -> bool")
            .method(">=", "(Integer | Float) -> bool")
            .method("==", "(untyped) -> bool")
            .method("<=>", "(Integer | Float) -> Integer | (untyped) -> Integer?")
            .method("&", "(Integer) -> Integer")
            .method("|", "(Integer) -> Integer")
            .method("^", "(Integer) -> Integer")
            .method("<<", "(Integer) -> Integer")
            .method(">>", "(Integer) -> Integer")
            .method("-@", "() -> Integer")
            .method("~", "() -> Integer")
            .method("abs", "() -> Integer")
            .method("succ", "() -> Integer")
            .method("pred", "() -> Integer")
            .method("chr", "() -> String")
            .method("ord", "() -> Integer")
            .method("digits", "(?Integer) -> Array[Integer]")
            .method("divmod", "(Integer) -> [Integer, Integer] | (Float) -> [Float, Float]")
            .method("fdiv", "(Integer | Float) -> Float")
            .method("floor", "(?Integer) -> Integer")
            .method("ceil", "(?Integer) -> Integer")
            .method("round", "(?Integer) -> Integer")
            .method("to_s", "(?Integer) -> String")
            .method("to_i", "() -> Integer")
            .method("to_int", "() -> Integer")
            .pure_method("even?", "() -> bool")
            .pure_method("odd?", "() -> bool")
            .method("times", "() { (Integer) -> void } -> Integer")
            .method("upto", "(Integer) { (Integer) -> void } -> Integer")
            .method("downto", "(Integer) { (Integer) -> void } -> Integer")
            .method("step", "(Integer, ?Integer) { (Integer) -> void } -> Integer")
            .method("gcd", "(Integer) -> Integer")
            .method("lcm", "(Integer) -> Integer")
            .method("pow", "(Integer, ?Integer) -> Integer")
            .method("bit_length", "() -> Integer")
            .method("clamp", "(Integer, Integer) -> Integer")
            .singleton_method("sqrt", "(Integer) -> Integer")
    })
    .class("Float", |c| {
        c.superclass("Numeric")
            .method("+", "(Integer | Float) -> Float")
            .method("-", "(Integer | Float) -> Float")
            .method("*", "(Integer | Float) -> Float")
            .method("/", "(Integer | Float) -> Float")
            .method("%", "(Integer | Float) -> Float")
            .method("**", "(Integer | Float) -> Float")
            .method("<", "(Integer | Float) -> bool")
            .method("<=", "(Integer | Float) -> bool")
            .method(">", "(Integer | Float) -> bool")
            .method(">=", "(Integer | Float) -> bool")
            .method("<=>", "(Integer | Float) -> Integer | (untyped) -> Integer?")
            .method("-@", "() -> Float")
            .method("abs", "() -> Float")
            .method("floor", "() -> Integer | (Integer) -> Float")
            .method("ceil", "() -> Integer | (Integer) -> Float")
            .method("round", "() -> Integer | (Integer) -> Float")
            .method("truncate", "() -> Integer")
            .method("to_s", "() -> String")
            .method("to_f", "() -> Float")
            .pure_method("nan?", "() -> bool")
            .pure_method("infinite?", "() -> Integer?")
            .pure_method("finite?", "() -> bool")
    })
}

fn text(b: EnvironmentBuilder) -> EnvironmentBuilder {
    b.class("String", |c| {
        c.include("Comparable")
            .method("initialize", "(?String) -> void")
            .method("+", "(String) -> String")
            .method("*", "(Integer) -> String")
            .method("%", "(untyped) -> String")
            .method("<<", "(String | Integer) -> String")
            .method("==", "(untyped) -> bool")
            .method("<=>", "(String) -> Integer | (untyped) -> Integer?")
            .method("=~", "(Regexp) -> Integer?")
            .method(
                "[]",
                "(Integer) -> String? | (Integer, Integer) -> String? | (Range[Integer?]) -> String? | (Regexp) -> String? | (String) -> String?",
            )
            .method("[]=", "(Integer | String | Regexp, String) -> String")
            .pure_method("length", "() -> Integer")
            .pure_method("size", "() -> Integer")
            .pure_method("bytesize", "() -> Integer")
            .pure_method("empty?", "() -> bool")
            .method("upcase", "() -> String")
            .method("downcase", "() -> String")
            .method("capitalize", "() -> String")
            .method("swapcase", "() -> String")
            .method("strip", "() -> String")
            .method("lstrip", "() -> String")
            .method("rstrip", "() -> String")
            .method("chomp", "(?String) -> String")
            .method("chop", "() -> String")
            .method("reverse", "() -> String")
            .method("chars", "() -> Array[String]")
            .method("bytes", "() -> Array[Integer]")
            .method("lines", "() -> Array[String]")
            .method("split", "(?String | Regexp, ?Integer) -> Array[String]")
            .method("include?", "(String) -> bool")
            .method("start_with?", "(*String | Regexp) -> bool")
            .method("end_with?", "(*String) -> bool")
            .method("index", "(String | Regexp, ?Integer) -> Integer?")
            .method("sub", "(Regexp | String, String) -> String | (Regexp | String) { (String) -> _ToS } -> String")
            .method("gsub", "(Regexp | String, String) -> String | (Regexp | String) { (String) -> _ToS } -> String")
            .method("tr", "(String, String) -> String")
            .method("match", "(Regexp | String) -> untyped")
            .method("match?", "(Regexp | String) -> bool")
            .method("scan", "(Regexp | String) -> Array[untyped]")
            .method("each_char", "() { (String) -> void } -> String")
            .method("each_line", "() { (String) -> void } -> String")
            .method("center", "(Integer, ?String) -> String")
            .method("ljust", "(Integer, ?String) -> String")
            .method("rjust", "(Integer, ?String) -> String")
            .method("ord", "() -> Integer")
            .method("to_s", "() -> String")
            .method("to_str", "() -> String")
            .method("to_sym", "() -> Symbol")
            .method("to_i", "(?Integer) -> Integer")
            .method("to_f", "() -> Float")
            .method("freeze", "() -> self")
            .method("concat", "(*String) -> String")
            .method("prepend", "(*String) -> String")
            .method("replace", "(String) -> String")
            .method("count", "(String) -> Integer")
            .method("delete", "(String) -> String")
            .method("squeeze", "(?String) -> String")
            .method("encoding", "() -> untyped")
            .method("unpack", "(String) -> Array[untyped]")
            .method("succ", "() -> String")
            .method("hash", "() -> Integer")
    })
    .class("Symbol", |c| {
        c.include("Comparable")
            .method("to_s", "() -> String")
            .method("to_sym", "() -> Symbol")
            .method("to_proc", "() -> Proc")
            .method("id2name", "() -> String")
            .method("<=>", "(Symbol) -> Integer | (untyped) -> Integer?")
            .method("==", "(untyped) -> bool")
            .method("[]", "(Integer) -> String?")
            .pure_method("length", "() -> Integer")
            .pure_method("size", "() -> Integer")
            .pure_method("empty?", "() -> bool")
            .method("upcase", "() -> Symbol")
            .method("downcase", "() -> Symbol")
            .method("succ", "() -> Symbol")
    })
    .class("Regexp", |c| {
        c.method("initialize", "(String | Regexp, ?untyped) -> void")
            .method("=~", "(String?) -> Integer?")
            .method("===", "(untyped) -> bool")
            .method("match", "(String?) -> untyped")
            .method("match?", "(String?) -> bool")
            .method("source", "() -> String")
            .method("to_s", "() -> String")
            .singleton_method("escape", "(String | Symbol) -> String")
            .singleton_method("union", "(*String | Regexp) -> Regexp")
    })
}

fn collections(b: EnvironmentBuilder) -> EnvironmentBuilder {
    b.module("Enumerable[unchecked out Elem]", |m| {
        m.method("map", "[U] () { (Elem) -> U } -> Array[U]")
            .method("collect", "[U] () { (Elem) -> U } -> Array[U]")
            .method("flat_map", "[U] () { (Elem) -> Array[U] } -> Array[U]")
            .method("select", "() { (Elem) -> boolish } -> Array[Elem]")
            .method("filter", "() { (Elem) -> boolish } -> Array[Elem]")
            .method("reject", "() { (Elem) -> boolish } -> Array[Elem]")
            .method("find", "() { (Elem) -> boolish } -> Elem?")
            .method("detect", "() { (Elem) -> boolish } -> Elem?")
            .method("find_index", "(untyped) -> Integer? | () { (Elem) -> boolish } -> Integer?")
            .method("each_with_index", "() { (Elem, Integer) -> void } -> self")
            .method("each_with_object", "[M] (M) { (Elem, M) -> void } -> M")
            .method("inject", "[A] (A) { (A, Elem) -> A } -> A | () { (Elem, Elem) -> Elem } -> Elem?")
            .method("reduce", "[A] (A) { (A, Elem) -> A } -> A | () { (Elem, Elem) -> Elem } -> Elem?")
            .method("sum", "() -> untyped | [U] () { (Elem) -> U } -> U")
            .method("include?", "(untyped) -> bool")
            .method("member?", "(untyped) -> bool")
            .method("to_a", "() -> Array[Elem]")
            .method("entries", "() -> Array[Elem]")
            .method("sort", "() -> Array[Elem] | () { (Elem, Elem) -> Integer } -> Array[Elem]")
            .method("sort_by", "[U] () { (Elem) -> U } -> Array[Elem]")
            .method("min", "() -> Elem?")
            .method("max", "() -> Elem?")
            .method("min_by", "[U] () { (Elem) -> U } -> Elem?")
            .method("max_by", "[U] () { (Elem) -> U } -> Elem?")
            .method("group_by", "[K] () { (Elem) -> K } -> Hash[K, Array[Elem]]")
            .method("partition", "() { (Elem) -> boolish } -> [Array[Elem], Array[Elem]]")
            .method("count", "() -> Integer | (untyped) -> Integer | () { (Elem) -> boolish } -> Integer")
            .method("first", "() -> Elem? | (Integer) -> Array[Elem]")
            .method("take", "(Integer) -> Array[Elem]")
            .method("drop", "(Integer) -> Array[Elem]")
            .method("any?", "() -> bool | () { (Elem) -> boolish } -> bool")
            .method("all?", "() -> bool | () { (Elem) -> boolish } -> bool")
            .method("none?", "() -> bool | () { (Elem) -> boolish } -> bool")
            .method("each_slice", "(Integer) { (Array[Elem]) -> void } -> nil")
            .method("zip", "(*Array[untyped]) -> Array[Array[untyped]]")
            .method("uniq", "() -> Array[Elem]")
            .method("tally", "() -> Hash[Elem, Integer]")
            .method("filter_map", "[U] () { (Elem) -> U } -> Array[U]")
            .method("to_h", "() -> Hash[untyped, untyped]")
    })
    .class("Array[unchecked out Elem]", |c| {
        c.include("Enumerable[Elem]")
            .method("initialize", "() -> void | (Integer, ?Elem) -> void")
            .method("[]", "(Integer) -> Elem | (Integer, Integer) -> Array[Elem]? | (Range[Integer?]) -> Array[Elem]?")
            .method("[]=", "(Integer, Elem) -> Elem | (Integer, Integer, Elem) -> Elem")
            .method("at", "(Integer) -> Elem?")
            .method("dig", "(Integer, *untyped) -> untyped")
            .method("fetch", "(Integer) -> Elem | [X] (Integer, X) -> (Elem | X) | [X] (Integer) { (Integer) -> X } -> (Elem | X)")
            .method("<<", "(Elem) -> self")
            .method("push", "(*Elem) -> self")
            .method("append", "(*Elem) -> self")
            .method("unshift", "(*Elem) -> self")
            .method("insert", "(Integer, *Elem) -> self")
            .method("concat", "(*Array[Elem]) -> self")
            .method("pop", "() -> Elem? | (Integer) -> Array[Elem]")
            .method("shift", "() -> Elem? | (Integer) -> Array[Elem]")
            .method("first", "() -> Elem? | (Integer) -> Array[Elem]")
            .method("last", "() -> Elem? | (Integer) -> Array[Elem]")
            .method("sample", "() -> Elem?")
            .method("delete", "(untyped) -> Elem?")
            .method("delete_at", "(Integer) -> Elem?")
            .method("delete_if", "() { (Elem) -> boolish } -> self")
            .method("clear", "() -> self")
            .pure_method("size", "() -> Integer")
            .pure_method("length", "() -> Integer")
            .pure_method("empty?", "() -> bool")
            .method("each", "() { (Elem) -> void } -> self")
            .method("each_index", "() { (Integer) -> void } -> self")
            .method("map", "[U] () { (Elem) -> U } -> Array[U]")
            .method("map!", "() { (Elem) -> Elem } -> self")
            .method("select", "() { (Elem) -> boolish } -> Array[Elem]")
            .method("select!", "() { (Elem) -> boolish } -> self?")
            .method("reject", "() { (Elem) -> boolish } -> Array[Elem]")
            .method("compact", "() -> Array[Elem]")
            .method("flatten", "(?Integer) -> Array[untyped]")
            .method("join", "(?String) -> String")
            .method("reverse", "() -> Array[Elem]")
            .method("rotate", "(?Integer) -> Array[Elem]")
            .method("sort", "() -> Array[Elem] | () { (Elem, Elem) -> Integer } -> Array[Elem]")
            .method("sort!", "() -> self | () { (Elem, Elem) -> Integer } -> self")
            .method("uniq", "() -> Array[Elem]")
            .method("shuffle", "() -> Array[Elem]")
            .method("index", "(untyped) -> Integer? | () { (Elem) -> boolish } -> Integer?")
            .method("count", "() -> Integer | (untyped) -> Integer | () { (Elem) -> boolish } -> Integer")
            .method("+", "(Array[Elem]) -> Array[Elem]")
            .method("-", "(Array[untyped]) -> Array[Elem]")
            .method("*", "(Integer) -> Array[Elem] | (String) -> String")
            .method("&", "(Array[untyped]) -> Array[Elem]")
            .method("|", "(Array[Elem]) -> Array[Elem]")
            .method("==", "(untyped) -> bool")
            .method("<=>", "(untyped) -> Integer?")
            .method("include?", "(untyped) -> bool")
            .method("to_a", "() -> Array[Elem]")
            .method("to_ary", "() -> Array[Elem]")
            .method("to_h", "() -> Hash[untyped, untyped]")
            .method("dup", "() -> Array[Elem]")
            .method("take", "(Integer) -> Array[Elem]")
            .method("drop", "(Integer) -> Array[Elem]")
            .method("slice", "(Integer) -> Elem? | (Integer, Integer) -> Array[Elem]?")
            .method("min", "() -> Elem?")
            .method("max", "() -> Elem?")
            .method("sum", "() -> untyped | [U] () { (Elem) -> U } -> U")
            .method("product", "(*Array[untyped]) -> Array[Array[untyped]]")
            .method("combination", "(Integer) { (Array[Elem]) -> void } -> self")
            .method("transpose", "() -> Array[Array[untyped]]")
            .method("pack", "(String) -> String")
            .method("fill", "(Elem) -> self")
            .method("replace", "(Array[Elem]) -> self")
            .method("cycle", "(?Integer) { (Elem) -> void } -> nil")
    })
    .class("Hash[unchecked out K, unchecked out V]", |c| {
        c.include("Enumerable[[K, V]]")
            .method("initialize", "() -> void | (V) -> void | () { (Hash[K, V], K) -> V } -> void")
            .method("[]", "(K) -> V?")
            .method("[]=", "(K, V) -> V")
            .method("store", "(K, V) -> V")
            .method("fetch", "(K) -> V | [X] (K, X) -> (V | X) | [X] (K) { (K) -> X } -> (V | X)")
            .method("dig", "(K, *untyped) -> untyped")
            .pure_method("key?", "(K) -> bool")
            .pure_method("has_key?", "(K) -> bool")
            .pure_method("include?", "(K) -> bool")
            .pure_method("member?", "(K) -> bool")
            .pure_method("value?", "(V) -> bool")
            .method("key", "(V) -> K?")
            .method("keys", "() -> Array[K]")
            .method("values", "() -> Array[V]")
            .method("values_at", "(*K) -> Array[V?]")
            .pure_method("size", "() -> Integer")
            .pure_method("length", "() -> Integer")
            .pure_method("empty?", "() -> bool")
            .method("each", "() { (K, V) -> void } -> self")
            .method("each_pair", "() { (K, V) -> void } -> self")
            .method("each_key", "() { (K) -> void } -> self")
            .method("each_value", "() { (V) -> void } -> self")
            .method("map", "[U] () { (K, V) -> U } -> Array[U]")
            .method("flat_map", "[U] () { (K, V) -> Array[U] } -> Array[U]")
            .method("select", "() { (K, V) -> boolish } -> Hash[K, V]")
            .method("filter", "() { (K, V) -> boolish } -> Hash[K, V]")
            .method("reject", "() { (K, V) -> boolish } -> Hash[K, V]")
            .method("filter_map", "[U] () { (K, V) -> U } -> Array[U]")
            .method("find", "() { (K, V) -> boolish } -> [K, V]?")
            .method("any?", "() -> bool | () { (K, V) -> boolish } -> bool")
            .method("all?", "() -> bool | () { (K, V) -> boolish } -> bool")
            .method("count", "() -> Integer | () { (K, V) -> boolish } -> Integer")
            .method("sum", "() -> untyped | [U] () { (K, V) -> U } -> U")
            .method("each_with_object", "[M] (M) { ([K, V], M) -> void } -> M")
            .method("merge", "[A, B] (*Hash[A, B]) -> Hash[A | K, B | V]")
            .method("merge!", "(*Hash[K, V]) -> self")
            .method("update", "(*Hash[K, V]) -> self")
            .method("delete", "(K) -> V?")
            .method("delete_if", "() { (K, V) -> boolish } -> self")
            .method("transform_values", "[U] () { (V) -> U } -> Hash[K, U]")
            .method("transform_keys", "[U] () { (K) -> U } -> Hash[U, V]")
            .method("group_by", "[G] () { (K, V) -> G } -> Hash[G, Array[[K, V]]]")
            .method("sort_by", "[U] () { (K, V) -> U } -> Array[[K, V]]")
            .method("min_by", "[U] () { (K, V) -> U } -> [K, V]?")
            .method("max_by", "[U] () { (K, V) -> U } -> [K, V]?")
            .method("to_a", "() -> Array[[K, V]]")
            .method("to_h", "() -> Hash[K, V]")
            .method("invert", "() -> Hash[V, K]")
            .method("slice", "(*K) -> Hash[K, V]")
            .method("except", "(*K) -> Hash[K, V]")
            .method("clear", "() -> self")
            .method("dup", "() -> Hash[K, V]")
            .method("==", "(untyped) -> bool")
            .method("default", "() -> V?")
            .method("default=", "(V) -> V")
            .method("compare_by_identity", "() -> self")
            .method("compact", "() -> Hash[K, V]")
    })
    .class("Range[out Elem]", |c| {
        c.include("Enumerable[Elem]")
            .method("initialize", "(Elem, Elem, ?bool) -> void")
            .pure_method("begin", "() -> Elem")
            .pure_method("end", "() -> Elem")
            .pure_method("first", "() -> Elem | (Integer) -> Array[Elem]")
            .pure_method("last", "() -> Elem | (Integer) -> Array[Elem]")
            .pure_method("exclude_end?", "() -> bool")
            .method("each", "() { (Elem) -> void } -> self")
            .method("step", "(Integer) { (Elem) -> void } -> self")
            .method("to_a", "() -> Array[Elem]")
            .method("size", "() -> Integer?")
            .method("count", "() -> Integer")
            .method("include?", "(untyped) -> bool")
            .method("cover?", "(untyped) -> bool")
            .method("===", "(untyped) -> bool")
            .method("min", "() -> Elem?")
            .method("max", "() -> Elem?")
            .method("sum", "() -> untyped")
    })
}

fn misc(b: EnvironmentBuilder) -> EnvironmentBuilder {
    b.class("NilClass", |c| {
        c.method("to_a", "() -> []")
            .method("to_s", "() -> \"\"")
            .method("to_i", "() -> 0")
            .method("to_h", "() -> Hash[untyped, untyped]")
            .method("inspect", "() -> \"nil\"")
            .pure_method("nil?", "() -> true")
            .method("&", "(untyped) -> false")
            .method("|", "(untyped) -> bool")
            .method("!", "() -> true")
    })
    .class("TrueClass", |c| {
        c.method("!", "() -> false")
            .method("&", "(untyped) -> bool")
            .method("|", "(untyped) -> true")
            .method("^", "(untyped) -> bool")
            .method("to_s", "() -> \"true\"")
    })
    .class("FalseClass", |c| {
        c.method("!", "() -> true")
            .method("&", "(untyped) -> false")
            .method("|", "(untyped) -> bool")
            .method("^", "(untyped) -> bool")
            .method("to_s", "() -> \"false\"")
    })
    .class("Proc", |c| {
        c.method("call", "(*untyped) -> untyped")
            .method("[]", "(*untyped) -> untyped")
            .method("yield", "(*untyped) -> untyped")
            .method("===", "(*untyped) -> untyped")
            .method("to_proc", "() -> self")
            .pure_method("arity", "() -> Integer")
            .pure_method("lambda?", "() -> bool")
            .method("curry", "(?Integer) -> Proc")
            .method("parameters", "() -> Array[[Symbol, Symbol]]")
    })
    .class("Exception", |c| {
        c.method("initialize", "(?String) -> void")
            .pure_method("message", "() -> String")
            .method("full_message", "() -> String")
            .method("backtrace", "() -> Array[String]?")
            .method("set_backtrace", "(Array[String]) -> Array[String]")
            .method("cause", "() -> Exception?")
            .method("exception", "(?String) -> self")
            .singleton_method("exception", "(?String) -> Exception")
    })
    .global("$PROGRAM_NAME", "String")
    .global("$0", "String")
    .global("$stdout", "untyped")
    .global("$stderr", "untyped")
    .global("$stdin", "untyped")
    .global("$DEBUG", "bool")
    .global("$VERBOSE", "bool?")
    .constant("ARGV", "Array[String]")
    .constant("RUBY_VERSION", "String")
    .constant("ENV", "Hash[String, String]")
}
