//! Helper preambles pasted at the `Imports` and `Utilities` slots.
//!
//! Each target ships its own small runtime so the generated file has no
//! dependency beyond the parser library it targets.

// -------------------------------- Python ---------------------------------- //

pub const PY_IMPORTS: &str = r#"import re
import json
from contextlib import suppress
from functools import reduce
from html import unescape as _html_unescape
from typing import Any, ClassVar, Dict, List, Optional, TypedDict, Union"#;

pub const PY_LXML_IMPORTS: &str = r#"from lxml import html

FALLBACK_HTML_STR = "<html><body></body></html>""#;

pub const PY_PARSEL_IMPORTS: &str = "from parsel import Selector, SelectorList";

pub const PY_BS4_IMPORTS: &str = r#"from bs4 import BeautifulSoup, ResultSet, Tag


def ssc_bs4_attr(v: Union[str, List[str]]) -> str:
    return v if isinstance(v, str) else " ".join(v)"#;

pub const PY_SELECTOLAX_IMPORTS: &str = "from selectolax.parser import HTMLParser, Node";

pub const PY_HELPERS: &str = r#"_RE_HEX_ENTITY = re.compile(r"&#x([0-9a-fA-F]+);")
_RE_UNICODE_ENTITY = re.compile(r"\\u([0-9a-fA-F]{4})")
_RE_BYTES_ENTITY = re.compile(r"\\x([0-9a-fA-F]{2})")
_RE_CHARS_MAP = {"\\b": "\b", "\\f": "\f", "\\n": "\n", "\\r": "\r", "\\t": "\t"}


def ssc_unescape(s: str) -> str:
    s = _html_unescape(s)
    s = _RE_HEX_ENTITY.sub(lambda m: chr(int(m.group(1), 16)), s)
    s = _RE_UNICODE_ENTITY.sub(lambda m: chr(int(m.group(1), 16)), s)
    s = _RE_BYTES_ENTITY.sub(lambda m: chr(int(m.group(1), 16)), s)
    for ch, r in _RE_CHARS_MAP.items():
        s = s.replace(ch, r)
    return s


def ssc_map_replace(s: str, old: List[str], new: List[str]) -> str:
    return reduce(lambda acc, kv: acc.replace(kv[0], kv[1]), zip(old, new), s)


def ssc_rm_prefix(v: str, p: str) -> str:
    return v[len(p):] if v.startswith(p) else v


def ssc_rm_suffix(v: str, s: str) -> str:
    return v[: -len(s)] if s and v.endswith(s) else v


def ssc_rm_prefix_and_suffix(v: str, p: str, s: str) -> str:
    return ssc_rm_suffix(ssc_rm_prefix(v, p), s)"#;

// ---------------------------------- JS ------------------------------------ //

pub const JS_HELPERS: &str = r##"const SSC_CHAR_ESCAPES = { b: "\b", f: "\f", n: "\n", r: "\r", t: "\t" };

function sscUnescape(s) {
    const named = { amp: "&", lt: "<", gt: ">", quot: '"', apos: "'", nbsp: " " };
    return s
        .replace(/&(amp|lt|gt|quot|apos|nbsp);/g, (_, n) => named[n])
        .replace(/&#(\d+);/g, (_, d) => String.fromCodePoint(parseInt(d, 10)))
        .replace(/&#x([0-9a-fA-F]+);/g, (_, h) => String.fromCodePoint(parseInt(h, 16)))
        .replace(/\\u([0-9a-fA-F]{4})/g, (_, h) => String.fromCodePoint(parseInt(h, 16)))
        .replace(/\\x([0-9a-fA-F]{2})/g, (_, h) => String.fromCodePoint(parseInt(h, 16)))
        .replace(/\\([bfnrt])/g, (_, c) => SSC_CHAR_ESCAPES[c]);
}

function sscEscapeChars(chars) {
    return chars.replace(/[\\\]\[^-]/g, "\\$&");
}

function sscTrim(v, chars) {
    if (!chars) return v.trim();
    const c = sscEscapeChars(chars);
    return v.replace(new RegExp(`^[${c}]+|[${c}]+$`, "g"), "");
}

function sscLTrim(v, chars) {
    if (!chars) return v.trimStart();
    return v.replace(new RegExp(`^[${sscEscapeChars(chars)}]+`), "");
}

function sscRTrim(v, chars) {
    if (!chars) return v.trimEnd();
    return v.replace(new RegExp(`[${sscEscapeChars(chars)}]+$`), "");
}

function sscMapReplace(v, olds, news) {
    return olds.reduce((acc, o, i) => acc.replaceAll(o, news[i]), v);
}

function sscRmPrefix(v, p) {
    return v.startsWith(p) ? v.slice(p.length) : v;
}

function sscRmSuffix(v, s) {
    return s && v.endsWith(s) ? v.slice(0, -s.length) : v;
}

function sscRmPrefixAndSuffix(v, p, s) {
    return sscRmSuffix(sscRmPrefix(v, p), s);
}

function sscAttr(v, key) {
    const r = v.getAttribute(key);
    if (r === null) throw new Error(`missing attribute ${key}`);
    return r;
}

function sscIndex(v, i) {
    const r = v.at(i);
    if (r === undefined) throw new Error(`index ${i} out of range`);
    return r;
}

function sscToInt(v) {
    const r = parseInt(v, 10);
    if (Number.isNaN(r)) throw new Error(`not an int: ${v}`);
    return r;
}

function sscToFloat(v) {
    const r = parseFloat(v);
    if (Number.isNaN(r)) throw new Error(`not a float: ${v}`);
    return r;
}

function sscToBool(v) {
    if (Array.isArray(v)) return v.length > 0;
    return Boolean(v) || v === 0;
}

function sscXpath(v, q) {
    const d = v.ownerDocument || v;
    return d.evaluate(q, v, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
}

function sscXpathAll(v, q) {
    const d = v.ownerDocument || v;
    const r = d.evaluate(q, v, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
    return Array.from({ length: r.snapshotLength }, (_, i) => r.snapshotItem(i));
}"##;

// ---------------------------------- Go ------------------------------------ //

pub const GO_IMPORTS: &str = r#"import (
	"encoding/json"
	"fmt"
	"html"
	"regexp"
	"slices"
	"strconv"
	"strings"

	"github.com/PuerkitoBio/goquery"
)"#;

pub const GO_HELPERS: &str = r#"var (
	sscUnicodeEscRe = regexp.MustCompile(`\\u([0-9a-fA-F]{4})`)
	sscByteEscRe    = regexp.MustCompile(`\\x([0-9a-fA-F]{2})`)
	sscCharEsc      = strings.NewReplacer(`\b`, "\b", `\f`, "\f", `\n`, "\n", `\r`, "\r", `\t`, "\t")
)

func sscUnescape(v string) string {
	v = html.UnescapeString(v)
	decode := func(m string) string {
		n, err := strconv.ParseUint(m[2:], 16, 32)
		if err != nil {
			return m
		}
		return string(rune(n))
	}
	v = sscUnicodeEscRe.ReplaceAllStringFunc(v, decode)
	v = sscByteEscRe.ReplaceAllStringFunc(v, decode)
	return sscCharEsc.Replace(v)
}

func sscMapStr(vs []string, f func(string) string) []string {
	r := make([]string, len(vs))
	for i, s := range vs {
		r[i] = f(s)
	}
	return r
}

func sscTrim(v, cutset string) string {
	if cutset == "" {
		return strings.TrimSpace(v)
	}
	return strings.Trim(v, cutset)
}

func sscLTrim(v, cutset string) string {
	if cutset == "" {
		return strings.TrimLeft(v, " \t\n\r\v\f")
	}
	return strings.TrimLeft(v, cutset)
}

func sscRTrim(v, cutset string) string {
	if cutset == "" {
		return strings.TrimRight(v, " \t\n\r\v\f")
	}
	return strings.TrimRight(v, cutset)
}

func sscMapReplace(v string, olds, news []string) string {
	for i, o := range olds {
		v = strings.ReplaceAll(v, o, news[i])
	}
	return v
}

func sscCss(v *goquery.Selection, query string) (*goquery.Selection, error) {
	r := v.Find(query).First()
	if r.Length() == 0 {
		return nil, fmt.Errorf("no element matched %q", query)
	}
	return r, nil
}

func sscEq(v *goquery.Selection, i int) (*goquery.Selection, error) {
	r := v.Eq(i)
	if r.Length() == 0 {
		return nil, fmt.Errorf("index %d out of range", i)
	}
	return r, nil
}

func sscIndex[T any](v []T, i int) (T, error) {
	j := i
	if j < 0 {
		j += len(v)
	}
	if j < 0 || j >= len(v) {
		var zero T
		return zero, fmt.Errorf("index %d out of range", i)
	}
	return v[j], nil
}

func sscGetAttr(v *goquery.Selection, key string) (string, error) {
	if r, ok := v.Attr(key); ok {
		return r, nil
	}
	return "", fmt.Errorf("attribute %q not found", key)
}

func sscGetManyAttrs(v *goquery.Selection, keys []string) []string {
	r := make([]string, 0, len(keys))
	for _, k := range keys {
		if a, ok := v.Attr(k); ok {
			r = append(r, a)
		}
	}
	return r
}

func sscEachManyAttrs(v *goquery.Selection, keys []string) []string {
	r := make([]string, 0)
	v.Each(func(_ int, s *goquery.Selection) {
		r = append(r, sscGetManyAttrs(s, keys)...)
	})
	return r
}

func sscEachText(v *goquery.Selection) []string {
	return v.Map(func(_ int, s *goquery.Selection) string { return s.Text() })
}

func sscEachRaw(v *goquery.Selection) ([]string, error) {
	r := make([]string, 0, v.Length())
	for i := 0; i < v.Length(); i++ {
		h, err := goquery.OuterHtml(v.Eq(i))
		if err != nil {
			return nil, err
		}
		r = append(r, h)
	}
	return r, nil
}

func sscHasAttr(v *goquery.Selection, key string) bool {
	_, ok := v.Attr(key)
	return ok
}

func sscEachHasAttr(v *goquery.Selection, key string, want bool) bool {
	for i := 0; i < v.Length(); i++ {
		if sscHasAttr(v.Eq(i), key) != want {
			return false
		}
	}
	return true
}

func sscRegexMatch(v string, re *regexp.Regexp, group int) (string, error) {
	m := re.FindStringSubmatch(v)
	if m == nil || group >= len(m) {
		return "", fmt.Errorf("pattern %q not matched", re.String())
	}
	return m[group], nil
}

func sscRegexFindAll(v string, re *regexp.Regexp) []string {
	r := make([]string, 0)
	for _, m := range re.FindAllStringSubmatch(v, -1) {
		if len(m) > 1 {
			r = append(r, m[1])
		} else {
			r = append(r, m[0])
		}
	}
	return r
}

func sscAnyMatch(v []string, re *regexp.Regexp) bool {
	for _, s := range v {
		if re.MatchString(s) {
			return true
		}
	}
	return false
}

func sscAllMatch(v []string, re *regexp.Regexp) bool {
	for _, s := range v {
		if !re.MatchString(s) {
			return false
		}
	}
	return len(v) > 0
}

func sscAnyEqual(v string, values []string) bool {
	for _, s := range values {
		if v == s {
			return true
		}
	}
	return false
}

func sscAnyContains(v string, values []string) bool {
	for _, s := range values {
		if strings.Contains(v, s) {
			return true
		}
	}
	return false
}

func sscAnyPrefix(v string, values []string) bool {
	for _, s := range values {
		if strings.HasPrefix(v, s) {
			return true
		}
	}
	return false
}

func sscAnySuffix(v string, values []string) bool {
	for _, s := range values {
		if strings.HasSuffix(v, s) {
			return true
		}
	}
	return false
}

func sscFilter(v []string, keep func(string) bool) []string {
	r := make([]string, 0, len(v))
	for _, s := range v {
		if keep(s) {
			r = append(r, s)
		}
	}
	return r
}

func sscUnique(v []string) []string {
	seen := make(map[string]struct{}, len(v))
	r := make([]string, 0, len(v))
	for _, s := range v {
		if _, ok := seen[s]; !ok {
			seen[s] = struct{}{}
			r = append(r, s)
		}
	}
	return r
}

func sscToInts(v []string) ([]int, error) {
	r := make([]int, len(v))
	for i, s := range v {
		n, err := strconv.Atoi(s)
		if err != nil {
			return nil, err
		}
		r[i] = n
	}
	return r, nil
}

func sscToFloats(v []string) ([]float64, error) {
	r := make([]float64, len(v))
	for i, s := range v {
		n, err := strconv.ParseFloat(s, 64)
		if err != nil {
			return nil, err
		}
		r[i] = n
	}
	return r, nil
}

func sscToBool(v any) bool {
	switch t := v.(type) {
	case nil:
		return false
	case string:
		return t != ""
	case bool:
		return t
	case *string:
		return t != nil && *t != ""
	case []string:
		return len(t) > 0
	case []int:
		return len(t) > 0
	case []float64:
		return len(t) > 0
	case *goquery.Selection:
		return t != nil && t.Length() > 0
	}
	return true
}

func sscAssert(ok bool, msg string) error {
	if ok {
		return nil
	}
	return fmt.Errorf("%s", msg)
}

func sscSubDocument(v *goquery.Selection) (*goquery.Document, error) {
	if v.Length() == 0 {
		return nil, fmt.Errorf("empty selection")
	}
	return goquery.NewDocumentFromNode(v.Nodes[0]), nil
}

func sscJsonPath(raw string, path ...any) ([]byte, error) {
	if len(path) == 0 {
		return []byte(raw), nil
	}
	var data any
	if err := json.Unmarshal([]byte(raw), &data); err != nil {
		return nil, err
	}
	for _, p := range path {
		switch key := p.(type) {
		case string:
			obj, ok := data.(map[string]any)
			if !ok {
				return nil, fmt.Errorf("json key %q: not an object", key)
			}
			data = obj[key]
		case int:
			arr, ok := data.([]any)
			if !ok || key >= len(arr) {
				return nil, fmt.Errorf("json index %d out of range", key)
			}
			data = arr[key]
		}
	}
	return json.Marshal(data)
}"#;

// ---------------------------------- Lua ----------------------------------- //

pub const LUA_IMPORTS: &str = r#"local htmlparser = require("htmlparser")
local rex = require("rex_pcre")
local json = require("dkjson")"#;

pub const LUA_HELPERS: &str = r##"local Ssc = {}

local SSC_ENTITIES = { amp = "&", lt = "<", gt = ">", quot = '"', apos = "'", nbsp = " " }
local SSC_CHAR_ESCAPES = { b = "\b", f = "\f", n = "\n", r = "\r", t = "\t" }

local function ssc_plain(s)
    return (s:gsub("%p", "%%%0"))
end

local function ssc_class(chars)
    if chars == nil then
        return "%s"
    end
    return "[" .. ssc_plain(chars) .. "]"
end

function Ssc.css(v, q)
    local r = v:select(q)[1]
    if r == nil then
        error("no match for " .. q)
    end
    return r
end

function Ssc.attr(v, key)
    local r = v.attributes[key]
    if r == nil then
        error("missing attribute " .. key)
    end
    return r
end

function Ssc.attrs(v, keys)
    local out = {}
    for _, k in ipairs(keys) do
        local a = v.attributes[k]
        if a ~= nil then
            out[#out + 1] = a
        end
    end
    return out
end

function Ssc.attrs_all(vs, keys)
    local out = {}
    for _, e in ipairs(vs) do
        for _, a in ipairs(Ssc.attrs(e, keys)) do
            out[#out + 1] = a
        end
    end
    return out
end

function Ssc.text(v)
    return (v:getcontent():gsub("<[^>]*>", ""))
end

function Ssc.raw(v)
    return v:gettext()
end

function Ssc.map(v, f)
    local out = {}
    for i, x in ipairs(v) do
        out[i] = f(x)
    end
    return out
end

function Ssc.filter(v, f)
    local out = {}
    for _, x in ipairs(v) do
        if f(x) then
            out[#out + 1] = x
        end
    end
    return out
end

function Ssc.any(v, f)
    for _, x in ipairs(v) do
        if f(x) then
            return true
        end
    end
    return false
end

function Ssc.all(v, f)
    for _, x in ipairs(v) do
        if not f(x) then
            return false
        end
    end
    return true
end

function Ssc.ltrim(v, chars)
    return (v:gsub("^" .. ssc_class(chars) .. "+", ""))
end

function Ssc.rtrim(v, chars)
    return (v:gsub(ssc_class(chars) .. "+$", ""))
end

function Ssc.trim(v, chars)
    return Ssc.rtrim(Ssc.ltrim(v, chars), chars)
end

function Ssc.split(v, sep)
    local out, start = {}, 1
    while true do
        local i, j = v:find(sep, start, true)
        if i == nil or j < i then
            break
        end
        out[#out + 1] = v:sub(start, i - 1)
        start = j + 1
    end
    out[#out + 1] = v:sub(start)
    return out
end

function Ssc.replace(v, old, new)
    return (v:gsub(ssc_plain(old), (new:gsub("%%", "%%%%"))))
end

function Ssc.map_replace(v, olds, news)
    for i, o in ipairs(olds) do
        v = Ssc.replace(v, o, news[i])
    end
    return v
end

function Ssc.fmt(template, v)
    return (template:gsub("{{}}", function()
        return v
    end))
end

function Ssc.starts(v, p)
    return v:sub(1, #p) == p
end

function Ssc.ends(v, s)
    return s == "" or v:sub(-#s) == s
end

function Ssc.rm_prefix(v, p)
    if p ~= "" and Ssc.starts(v, p) then
        return v:sub(#p + 1)
    end
    return v
end

function Ssc.rm_suffix(v, s)
    if s ~= "" and Ssc.ends(v, s) then
        return v:sub(1, -#s - 1)
    end
    return v
end

function Ssc.rm_prefix_and_suffix(v, p, s)
    return Ssc.rm_suffix(Ssc.rm_prefix(v, p), s)
end

function Ssc.unescape(v)
    v = v:gsub("&(%a+);", function(n)
        return SSC_ENTITIES[n]
    end)
    v = v:gsub("&#(%d+);", function(d)
        return utf8.char(tonumber(d))
    end)
    v = v:gsub("&#[xX](%x+);", function(h)
        return utf8.char(tonumber(h, 16))
    end)
    v = v:gsub("\\u(%x%x%x%x)", function(h)
        return utf8.char(tonumber(h, 16))
    end)
    v = v:gsub("\\x(%x%x)", function(h)
        return utf8.char(tonumber(h, 16))
    end)
    v = v:gsub("\\([bfnrt])", SSC_CHAR_ESCAPES)
    return v
end

function Ssc.re(v, pattern, group)
    local r = { rex.find(v, pattern) }
    if r[1] == nil then
        error("no match for " .. pattern)
    end
    if group == 0 then
        return v:sub(r[1], r[2])
    end
    return r[group + 2]
end

function Ssc.re_all(v, pattern)
    local out = {}
    for m in rex.gmatch(v, pattern) do
        out[#out + 1] = m
    end
    return out
end

function Ssc.re_test(v, pattern)
    return rex.find(v, pattern) ~= nil
end

function Ssc.re_sub(v, pattern, repl)
    repl = repl:gsub("%%", "%%%%"):gsub("\\(%d)", "%%%1")
    return (rex.gsub(v, pattern, repl))
end

function Ssc.at(v, i)
    local r = v[i < 0 and #v + i + 1 or i + 1]
    if r == nil then
        error("index " .. i .. " out of range")
    end
    return r
end

function Ssc.unique(v)
    local seen, out = {}, {}
    for _, x in ipairs(v) do
        if not seen[x] then
            seen[x] = true
            out[#out + 1] = x
        end
    end
    return out
end

function Ssc.contains(v, x)
    if type(v) == "string" then
        return v:find(x, 1, true) ~= nil
    end
    for _, i in ipairs(v) do
        if i == x then
            return true
        end
    end
    return false
end

function Ssc.to_int(v)
    local r = math.tointeger(tonumber(v))
    if r == nil then
        error("not an int: " .. tostring(v))
    end
    return r
end

function Ssc.to_float(v)
    local r = tonumber(v)
    if r == nil then
        error("not a float: " .. tostring(v))
    end
    return r + 0.0
end

function Ssc.to_bool(v)
    if type(v) == "table" then
        return next(v) ~= nil
    end
    return v ~= nil and v ~= false and v ~= ""
end

function Ssc.json(v)
    local r, _, err = json.decode(v)
    if err ~= nil then
        error(err)
    end
    return r
end"##;

// ---------------------------------- Dart ---------------------------------- //

pub const DART_IMPORTS: &str = r#"import 'dart:convert';

import 'package:html/dom.dart';
import 'package:html/parser.dart' as html;"#;

pub const DART_HELPERS: &str = r##"const _sscEntities = {'amp': '&', 'lt': '<', 'gt': '>', 'quot': '"', 'apos': "'", 'nbsp': ' '};
const _sscCharEscapes = {'b': '\b', 'f': '\f', 'n': '\n', 'r': '\r', 't': '\t'};

Element sscCss(Element v, String q) {
  final r = v.querySelector(q);
  if (r == null) throw StateError('no match for $q');
  return r;
}

String sscAttr(Element v, String key) {
  final r = v.attributes[key];
  if (r == null) throw StateError('missing attribute $key');
  return r;
}

List<String> sscAttrs(Element v, List<String> keys) =>
    [for (final k in keys) if (v.attributes[k] != null) v.attributes[k]!];

T sscIndex<T>(List<T> v, int i) {
  final j = i < 0 ? v.length + i : i;
  if (j < 0 || j >= v.length) throw RangeError.index(i, v);
  return v[j];
}

String _sscClass(String chars) => '[${chars.replaceAllMapped(RegExp(r'[\\\]\[^-]'), (m) => '\\${m[0]}')}]';

String sscLTrim(String v, [String? chars]) =>
    chars == null ? v.trimLeft() : v.replaceFirst(RegExp('^${_sscClass(chars)}+'), '');

String sscRTrim(String v, [String? chars]) =>
    chars == null ? v.trimRight() : v.replaceFirst(RegExp('${_sscClass(chars)}+\$'), '');

String sscTrim(String v, [String? chars]) => sscRTrim(sscLTrim(v, chars), chars);

String sscMapReplace(String v, List<String> olds, List<String> news) {
  for (var i = 0; i < olds.length; i++) {
    v = v.replaceAll(olds[i], news[i]);
  }
  return v;
}

String sscRmPrefix(String v, String p) => v.startsWith(p) ? v.substring(p.length) : v;

String sscRmSuffix(String v, String s) =>
    s.isNotEmpty && v.endsWith(s) ? v.substring(0, v.length - s.length) : v;

String sscRmPrefixAndSuffix(String v, String p, String s) => sscRmSuffix(sscRmPrefix(v, p), s);

String sscUnescape(String v) => v
    .replaceAllMapped(RegExp(r'&(amp|lt|gt|quot|apos|nbsp);'), (m) => _sscEntities[m[1]]!)
    .replaceAllMapped(RegExp(r'&#(\d+);'), (m) => String.fromCharCode(int.parse(m[1]!)))
    .replaceAllMapped(RegExp(r'&#[xX]([0-9a-fA-F]+);'), (m) => String.fromCharCode(int.parse(m[1]!, radix: 16)))
    .replaceAllMapped(RegExp(r'\\u([0-9a-fA-F]{4})'), (m) => String.fromCharCode(int.parse(m[1]!, radix: 16)))
    .replaceAllMapped(RegExp(r'\\x([0-9a-fA-F]{2})'), (m) => String.fromCharCode(int.parse(m[1]!, radix: 16)))
    .replaceAllMapped(RegExp(r'\\([bfnrt])'), (m) => _sscCharEscapes[m[1]]!);

String sscReMatch(String v, RegExp re, int group) {
  final m = re.firstMatch(v);
  if (m == null) throw StateError('no match for ${re.pattern}');
  return m[group] ?? '';
}

List<String> sscReAll(String v, RegExp re) =>
    [for (final m in re.allMatches(v)) (m.groupCount > 0 ? m[1] : m[0]) ?? ''];

String sscReSub(String v, RegExp re, String repl) => v.replaceAllMapped(
    re, (m) => repl.replaceAllMapped(RegExp(r'\\(\d+)'), (g) => m[int.parse(g[1]!)] ?? ''));

bool sscToBool(Object? v) {
  if (v == null || v == false || v == '') return false;
  if (v is Iterable) return v.isNotEmpty;
  return true;
}"##;
