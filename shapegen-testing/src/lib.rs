//! Internal testing utilities for the shapegen crates.

use std::fmt::Debug;
use std::panic::{catch_unwind, RefUnwindSafe, UnwindSafe};

/// Utility for writing table-driven tests.
///
/// Tests declare a `Case` struct holding the inputs and expectations for one
/// case, build a collection of cases, and call [`test_each`](TestCases::test_each)
/// with the assertion body. Every case runs even if an earlier one panics;
/// at the end the failing cases are reported together with their debug
/// representations, so a broken table shows all broken rows at once.
///
/// ```
/// use shapegen_testing::TestCases;
///
/// #[derive(Debug)]
/// struct Case {
///     input: &'static str,
///     expected: usize,
/// }
///
/// let cases = [
///     Case { input: "ab", expected: 2 },
///     Case { input: "", expected: 0 },
/// ];
///
/// cases.test_each(|case| {
///     assert_eq!(case.input.len(), case.expected);
/// });
/// ```
///
/// Cases are passed to the test function by reference so that the failure
/// report can show the case afterwards. When owning the case is more
/// convenient, use [`test_each_clone`](TestCases::test_each_clone).
///
/// The test function and the cases must be unwind safe. Cases made of plain
/// data always are; for anything with interior mutability, wrap the offending
/// field in `std::panic::AssertUnwindSafe`.
pub trait TestCases {
    /// The data for a single test case.
    type Case;

    /// Run `test` against every case, then panic if any case failed.
    fn test_each(self, test: impl Fn(&Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe;

    /// Like [`test_each`](TestCases::test_each), but each case is cloned and
    /// handed to the test function by value.
    fn test_each_clone(self, test: impl Fn(Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + Clone + UnwindSafe;
}

fn report_failures(total: usize, failures: Vec<(usize, String)>) {
    if failures.is_empty() {
        return;
    }
    let mut message = format!("{} of {} test cases failed:", failures.len(), total);
    for (index, case) in &failures {
        message.push_str(&format!("\n  case {}: {}", index, case));
    }
    panic!("{}", message);
}

impl<I: IntoIterator> TestCases for I {
    type Case = I::Item;

    fn test_each(self, test: impl Fn(&I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe,
    {
        let mut failures = Vec::new();
        let mut total = 0;
        for (index, case) in self.into_iter().enumerate() {
            total += 1;
            if catch_unwind(|| test(&case)).is_err() {
                failures.push((index, format!("{:?}", case)));
            }
        }
        report_failures(total, failures);
    }

    fn test_each_clone(self, test: impl Fn(I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + Clone + UnwindSafe,
    {
        let mut failures = Vec::new();
        let mut total = 0;
        for (index, case) in self.into_iter().enumerate() {
            total += 1;
            let cloned = case.clone();
            let test = &test;
            if catch_unwind(move || test(cloned)).is_err() {
                failures.push((index, format!("{:?}", case)));
            }
        }
        report_failures(total, failures);
    }
}

#[cfg(test)]
mod tests {
    use super::TestCases;

    #[derive(Clone, Debug)]
    struct Case {
        x: u32,
    }

    #[test]
    fn test_passing_cases() {
        let cases = [Case { x: 1 }, Case { x: 2 }];
        cases.clone().test_each(|case| assert!(case.x > 0));
        cases.test_each_clone(|case| assert!(case.x > 0));
    }

    #[test]
    #[should_panic(expected = "1 of 2 test cases failed")]
    fn test_failing_case_reported() {
        let cases = [Case { x: 1 }, Case { x: 0 }];
        cases.test_each(|case| assert!(case.x > 0));
    }

    #[test]
    #[should_panic(expected = "case 0")]
    fn test_failure_report_names_case_index() {
        let cases = [Case { x: 0 }];
        cases.test_each_clone(|case| assert!(case.x > 0));
    }
}
