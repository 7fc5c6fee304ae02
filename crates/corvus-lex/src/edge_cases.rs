//! Edge case tests for corvus-lex
