use crate::*;


fn compile(pattern: &str) -> Regex {
    Regex::new(pattern, RegexOptions::new()).unwrap_or_else(|e| panic!("failed to compile '{pattern}': {e}"))
}

fn compile_with(pattern: &str, flags_spec: &str, right_to_left: bool) -> Regex {
    let options = RegexOptions::from_str_flags(flags_spec, right_to_left).unwrap();
    Regex::new(pattern, options).unwrap_or_else(|e| panic!("failed to compile '{pattern}': {e}"))
}

/// Assert `regex_s` matches every string in `valid` somewhere and matches
/// none of `invalid` anywhere.
fn check_matches(regex_s: &str, valid: &[&str], invalid: &[&str]) {
    let regex = compile(regex_s);
    for val in valid {
        assert!(regex.is_match(val, None), "expected '{regex_s}' to match '{val}'");
    }
    for val in invalid {
        assert!(!regex.is_match(val, None), "expected '{regex_s}' not to match '{val}'");
    }
}

mod character_classes {
    use super::*;

    #[test]
    fn shorthand_classes() {
        check_matches(r"\d", &["0"], &["a"]);
        check_matches(r"\D", &["a"], &["0"]);
        check_matches(r"\s", &["\t", "\n", " "], &["a"]);
        check_matches(r"\S", &["a"], &["\t", "\n"]);
        check_matches(r"\w", &["a", "9", "_"], &[" "]);
        check_matches(r"\W", &[" "], &["a", "9", "_"]);
    }

    #[test]
    fn negated_set() {
        check_matches(r"[^abc]", &["d"], &["a", "b", "c"]);
    }

    #[test]
    fn range_and_subtraction() {
        let r = compile(r"[a-z-[aeiou]]");
        assert!(r.is_match("b", None));
        assert!(!r.is_match("a", None));
    }
}

mod groups_and_captures {
    use super::*;

    #[test]
    fn multi_capture_retains_every_iteration() {
        // (a(b)*)*(b) against "aabbbaab": every iteration of the inner
        // group stays on its capture stack, not just the last.
        let r = compile(r"(a(b)*)*(b)");
        let m = r.find("aabbbaab", None, None);
        assert!(m.success());
        let group1 = m.group_at(1).unwrap();
        assert!(group1.captures().len() >= 2);
    }

    #[test]
    fn named_and_numbered_share_namespace() {
        let r = compile(r"(?<first>a)(b)");
        let m = r.find("ab", None, None);
        assert!(m.success());
        assert_eq!(m.group("first").unwrap().value(), "a");
        assert_eq!(m.group_at(2).unwrap().value(), "b");
    }

    #[test]
    fn unmatched_group_has_no_captures() {
        let r = compile(r"(a)|(b)");
        let m = r.find("a", None, None);
        assert!(m.success());
        assert!(m.group_at(1).unwrap().success());
        assert!(!m.group_at(2).unwrap().success());
    }

    #[test]
    fn balancing_group() {
        // (?<A>a)+(?<-A>b)+ against "aaab" balances every 'a' against a
        // trailing 'b'.
        let r = compile(r"(?<A>a)+(?<-A>b)+");
        let m = r.find("aaab", None, None);
        assert!(m.success());
        assert_eq!(m.value(), "aaab");
    }

    #[test]
    fn balancing_group_push_excludes_consumed_delimiter() {
        // `(?<Open>)` marks the content start (zero-width); `[^>]*` consumes
        // the content; `(?<Close-Open>>)` pops `Open` and must push onto
        // `Close` the content alone, not the `>` delimiter it just matched.
        let r = compile(r"(?<Open>)[^>]*(?<Close-Open>>)");
        let m = r.find("abc>", None, None);
        assert!(m.success());
        let close = m.group("Close").unwrap();
        assert_eq!(close.value(), "abc");
    }

    #[test]
    fn conditional_alternation() {
        // \b(?<a>a)?(?(a)a*|\w+) on "aaabbb bbbaaa": the first word starts
        // with 'a', so `a` captures and the `yes` branch (a*) runs, pulling
        // in only the rest of the leading a's; the second word doesn't
        // start with 'a', so `a` never captures and the `no` branch (\w+)
        // consumes the whole word instead.
        let r = compile(r"\b(?<a>a)?(?(a)a*|\w+)");
        let matches = r.find_iter("aaabbb bbbaaa", None);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].value(), "aaa");
        assert_eq!(matches[0].index(), 0);
        assert_eq!(matches[1].value(), "bbbaaa");
        assert_eq!(matches[1].index(), 7);
    }

    #[test]
    fn conditional_requires_existing_group() {
        let err = Regex::new(r"(?(a)x|y)", RegexOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}

mod lookaround {
    use super::*;

    #[test]
    fn variable_length_lookbehind() {
        // (?<=ab+)c on "aabbcc": the lookbehind is variable-length, and
        // only matches the first 'c'.
        let r = compile(r"(?<=ab+)c");
        let m = r.find("aabbcc", None, None);
        assert!(m.success());
        assert_eq!(m.index(), 4);
    }

    #[test]
    fn negative_lookahead_excludes_position() {
        let r = compile(r"a(?!b)");
        let m = r.find("ab", None, None);
        // "ab" has no position where 'a' is not followed by 'b', so this
        // must fail to match entirely.
        assert!(!m.success());
        assert!(compile(r"a(?!b)").is_match("ac", None));
    }

    #[test]
    fn positive_lookahead_preserves_captures() {
        let r = compile(r"(?=(a+))a");
        let m = r.find("aaa", None, None);
        assert!(m.success());
        assert_eq!(m.group_at(1).unwrap().value(), "aaa");
    }
}

mod right_to_left {
    use super::*;

    #[test]
    fn back_reference_rtl() {
        // \1?(a) evaluated right-to-left on "aaa".
        let r = compile_with(r"\1?(a)", "", true);
        let m = r.find("aaa", None, None);
        assert!(m.success());
    }

    #[test]
    fn rtl_finds_rightmost_first() {
        let r = compile_with("a", "", true);
        let m = r.find("aaa", None, None);
        assert!(m.success());
        assert_eq!(m.index(), 2);
    }
}

mod replace_and_split {
    use super::*;

    #[test]
    fn collapsed_plus_group() {
        // (?<A>a)(?<2>b)(?<B>c) against "abc": $+ is the last group in
        // collapsed order, which is B.
        let r = compile(r"(?<A>a)(?<2>b)(?<B>c)");
        let out = r.replace("abc", "$+", None, None).unwrap();
        assert_eq!(out, "c");
    }

    #[test]
    fn replace_with_calls_function_per_match() {
        let r = compile(r"\d+");
        let out = r.replace_with("a1 b22 c333", None, None, |m| m.value().len().to_string()).unwrap();
        assert_eq!(out, "a1 b2 c3");
    }

    #[test]
    fn numbered_backreference_template() {
        let r = compile(r"(\w+)@(\w+)");
        let out = r.replace("user@host", "$2!$1", None, None).unwrap();
        assert_eq!(out, "host!user");
    }

    #[test]
    fn whole_match_and_surrounding_text() {
        let r = compile(r"b");
        let out = r.replace("abc", "[$`-$&-$']", None, None).unwrap();
        assert_eq!(out, "a[a-b-c]c");
    }

    #[test]
    fn replace_respects_count() {
        let r = compile(r"a");
        let out = r.replace("aaaa", "x", Some(2), None).unwrap();
        assert_eq!(out, "xxaa");
    }

    #[test]
    fn negative_count_other_than_all_is_an_error() {
        let r = compile(r"a");
        let err = r.replace("aaa", "x", Some(-2), None).unwrap_err();
        assert!(matches!(err, Error::Runtime(RuntimeError::NegativeCount(-2))));
    }

    #[test]
    fn split_drops_matched_text() {
        let r = compile(r",\s*");
        let parts = r.split("a, b,c", None, None).unwrap();
        assert_eq!(parts, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn split_honors_count() {
        let r = compile(r",");
        let parts = r.split("a,b,c,d", Some(2), None).unwrap();
        assert_eq!(parts, vec!["a".to_string(), "b,c,d".to_string()]);
    }
}

mod escaping {
    use super::*;

    #[test]
    fn escape_then_unescape_round_trips() {
        let s = "1+1=2? (maybe)";
        let escaped = escape(s);
        assert_eq!(unescape(&escaped), s);
    }

    #[test]
    fn escaped_pattern_matches_itself_literally() {
        let literal = "a.b*c";
        let r = compile(&escape(literal));
        assert!(r.is_match(literal, None));
        assert!(!r.is_match("axbyc", None));
    }
}

mod inline_flags {
    use super::*;

    #[test]
    fn scoped_case_insensitive() {
        let r = compile(r"(?i:abc)def");
        assert!(r.is_match("ABCdef", None));
        assert!(!r.is_match("ABCDEF", None));
    }

    #[test]
    fn explicit_capture_mode_ignores_bare_groups() {
        let r = compile_with(r"(a)(?<b>b)", "n", false);
        let m = r.find("ab", None, None);
        assert!(m.success());
        assert!(m.group("b").unwrap().success());
    }

    #[test]
    fn inline_comment_between_atom_and_quantifier() {
        // (?#...) comments are always ignored, even sitting between an atom
        // and the repetition modifier that follows it.
        let r = compile(r"a(?#comment)*");
        assert!(r.is_match("aaa", None));
        assert!(r.is_match("", None));
    }

    #[test]
    fn extended_mode_whitespace_between_atom_and_quantifier() {
        let r = compile_with(r"a *", "x", false);
        assert!(r.is_match("aaa", None));
        assert!(r.is_match("", None));
    }
}

mod engine_loop {
    use super::*;

    #[test]
    fn zero_width_matches_advance() {
        let r = compile(r"a*");
        let matches = r.find_iter("aab", None);
        assert!(matches.len() >= 2);
    }

    #[test]
    fn windowed_search_respects_start() {
        let r = compile(r"a");
        let m = r.find("aaa", Some(1), None);
        assert!(m.success());
        assert_eq!(m.index(), 1);
    }

    #[test]
    fn match_value_matches_input_slice() {
        let r = compile(r"\w+");
        let m = r.find("hello world", None, None);
        assert!(m.success());
        let expected: String = "hello world".chars().skip(m.index()).take(m.length()).collect();
        assert_eq!(m.value(), expected);
    }

    #[test]
    fn length_restricted_window_does_not_see_past_it() {
        // "abcdef" windowed to the first 3 chars: `\z`/`$` must anchor at
        // the end of the window, not the end of the real string, and `.`
        // must not be able to read past it either.
        let r = compile(r"c\z");
        assert!(!r.is_match("abcdef", None), "full string: 'c' isn't at the true end");
        let m = r.find("abcdef", Some(0), Some(3));
        assert!(m.success(), "windowed to 'abc': \\z should anchor at the window's end");
        assert_eq!(m.index(), 2);

        let dot = compile(r"c.");
        let m = dot.find("abcdef", Some(0), Some(3));
        assert!(!m.success(), "the window ends right after 'c'; '.' has nothing left to consume");
    }

    #[test]
    fn start_anchor_respects_window_left_bound() {
        let r = compile(r"\Ab");
        let m = r.find("abc", Some(1), None);
        assert!(m.success(), "windowed to start at index 1, \\A should anchor there, not at absolute 0");
    }

    #[test]
    fn contiguous_match_anchors_at_search_start_with_no_prior_match() {
        // \G matches at the search's starting position even before any
        // match has happened yet, not just at the end of a previous one.
        let r = compile(r"\Gabc");
        let m = r.find("abc", None, None);
        assert!(m.success());
        assert_eq!(m.index(), 0);
    }

    #[test]
    fn contiguous_match_chains_across_find_iter() {
        // \Ga anchors each match to right where the previous one ended, so
        // it only matches the leading run of 'a's, not any scattered later.
        let r = compile(r"\Ga");
        let matches = r.find_iter("aaba", None);
        assert_eq!(matches.len(), 2);
    }
}

mod escapes_and_group_zero {
    use super::*;

    #[test]
    fn octal_null_escape_is_not_confused_with_group_zero() {
        let r = compile(r"a\0b");
        assert!(r.is_match("a\0b", None));
    }

    #[test]
    fn dollar_zero_refers_to_whole_match() {
        let r = compile(r"\w+");
        let out = r.replace("hello", "<$0>", None, None).unwrap();
        assert_eq!(out, "<hello>");
        let out = r.replace("hello", "<${0}>", None, None).unwrap();
        assert_eq!(out, "<hello>");
    }

    #[test]
    fn explicit_group_zero_is_rejected() {
        let err = Regex::new(r"(?<0>a)", RegexOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn unresolvable_backreference_salvages_as_octal() {
        // \8 can never be a back-reference (no group 8 in this pattern) and
        // 8 isn't a valid octal digit either, so it's a hard error...
        assert!(Regex::new(r"\8", RegexOptions::new()).is_err());
        // ...but \12 with no group 12 nor group 1 salvages as octal (a
        // two-digit octal value), matching a single control character.
        let r = compile(r"\12");
        assert!(r.is_match("\u{0A}", None));
    }
}
