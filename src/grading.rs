//! Substring checks used to grade free-text model output.
//!
//! Each check looks for markers a correct answer can be expected to
//! contain. This is shallow by intent: the suite measures whether an
//! answer is plausibly right, not whether it is well written.

/// Case-insensitive substring containment.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// True if any of the needles appears in the haystack, case-insensitively.
pub fn contains_any_ci(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| contains_ci(haystack, needle))
}

/// Generated code defines a function and returns something.
pub fn looks_like_function(content: &str) -> bool {
    content.contains("def ") && content.contains("return")
}

/// Generated code carries Python-style type annotations.
pub fn has_type_hints(content: &str) -> bool {
    content.contains("->") || content.contains(": int") || content.to_lowercase().contains(": list")
}

/// The answer names the fibonacci fix: the second recursive call must
/// use n-2.
pub fn identifies_fibonacci_fix(content: &str) -> bool {
    content.contains("n-2") || content.contains("n - 2") || content.contains("fibonacci(n-2)")
}

/// The answer gives quicksort's average-case complexity in some common
/// notation.
pub fn mentions_average_complexity(content: &str) -> bool {
    let lower = content.to_lowercase();
    lower.contains("n log n") || lower.contains("nlogn") || content.contains("O(n log n)")
}

/// The answer gives quicksort's quadratic worst case.
pub fn mentions_worst_case(content: &str) -> bool {
    content.contains("n^2")
        || content.contains("n²")
        || content.contains("O(n^2)")
        || content.contains("O(n2)")
}

/// The syllogism in the logic puzzle is invalid; a correct answer
/// declines to draw the conclusion.
pub fn rejects_syllogism(content: &str) -> bool {
    contains_any_ci(content, &["no", "cannot", "not necessarily"])
}

/// Classify a failed vision request from the error text: an explicit
/// capability complaint, or something else entirely.
pub fn vision_error_reason(error: &str) -> &'static str {
    if contains_any_ci(error, &["image", "multimodal", "vision"]) {
        "Model does not support vision/image input"
    } else {
        "Unknown error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_ci_ignores_case() {
        assert!(contains_ci("Water is h2o.", "H2O"));
        assert!(contains_ci("The formula is H2O", "h2o"));
        assert!(!contains_ci("The formula is HO2", "H2O"));
    }

    #[test]
    fn function_shape_needs_def_and_return() {
        assert!(looks_like_function(
            "def binary_search(arr, target):\n    return -1"
        ));
        assert!(!looks_like_function("binary search scans the middle"));
        assert!(!looks_like_function("def binary_search(arr): pass"));
    }

    #[test]
    fn type_hints_detected() {
        assert!(has_type_hints("def f(arr: list[int], target: int) -> int:"));
        assert!(has_type_hints("def f(arr: List[int]):"));
        assert!(!has_type_hints("def f(arr, target):\n    return -1"));
    }

    #[test]
    fn fibonacci_fix_variants() {
        assert!(identifies_fibonacci_fix("change n-3 to n-2"));
        assert!(identifies_fibonacci_fix("it should be fibonacci(n - 2)"));
        assert!(identifies_fibonacci_fix(
            "return fibonacci(n-1) + fibonacci(n-2)"
        ));
        assert!(!identifies_fibonacci_fix("the base case is wrong"));
    }

    #[test]
    fn quicksort_complexity_variants() {
        assert!(mentions_average_complexity("averages O(n log n) time"));
        assert!(mentions_average_complexity("the average is NlogN"));
        assert!(!mentions_average_complexity("it is quadratic on average"));

        assert!(mentions_worst_case("degrades to O(n^2)"));
        assert!(mentions_worst_case("worst case is n² comparisons"));
        assert!(!mentions_worst_case("the worst case is linearithmic"));
    }

    #[test]
    fn syllogism_rejection_phrases() {
        assert!(rejects_syllogism("No, we cannot conclude that."));
        assert!(rejects_syllogism("It does Not Necessarily follow."));
        assert!(!rejects_syllogism("Yes, they surely fade quickly."));
    }

    #[test]
    fn vision_errors_classified_by_keyword() {
        assert_eq!(
            vision_error_reason("This model does not accept IMAGE input"),
            "Model does not support vision/image input"
        );
        assert_eq!(
            vision_error_reason("unsupported content type: multimodal"),
            "Model does not support vision/image input"
        );
        assert_eq!(vision_error_reason("internal server error"), "Unknown error");
    }
}
