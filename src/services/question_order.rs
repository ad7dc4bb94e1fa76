use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::db::models::Question;

/// Order in which an attempt presents questions, as indices into the test definition.
pub(crate) fn build_order(question_count: usize, shuffle: bool, seed: u64) -> Vec<u32> {
    let mut order: Vec<u32> = (0..question_count as u32).collect();
    if shuffle {
        let mut rng = StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);
    }
    order
}

pub(crate) fn is_permutation(order: &[u32], question_count: usize) -> bool {
    if order.len() != question_count {
        return false;
    }
    let mut seen = vec![false; question_count];
    for &index in order {
        match seen.get_mut(index as usize) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

/// Questions in presentation order, each paired with its original index.
/// A stored order that no longer matches the test falls back to identity.
pub(crate) fn ordered<'a>(questions: &'a [Question], order: &[u32]) -> Vec<(u32, &'a Question)> {
    if !is_permutation(order, questions.len()) {
        return questions.iter().enumerate().map(|(index, q)| (index as u32, q)).collect();
    }
    order.iter().map(|&index| (index, &questions[index as usize])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::QuestionOptions;

    fn questions(count: usize) -> Vec<Question> {
        (0..count)
            .map(|idx| Question {
                text: format!("Q{idx}"),
                options: QuestionOptions {
                    a: "1".to_string(),
                    b: "2".to_string(),
                    c: "3".to_string(),
                    d: "4".to_string(),
                },
                correct_option: "A".to_string(),
                explanation: None,
            })
            .collect()
    }

    #[test]
    fn identity_without_shuffle() {
        assert_eq!(build_order(4, false, 99), vec![0, 1, 2, 3]);
    }

    #[test]
    fn shuffle_is_deterministic_per_seed() {
        let first = build_order(20, true, 42);
        let second = build_order(20, true, 42);

        assert_eq!(first, second);
        assert!(is_permutation(&first, 20));
        assert_ne!(first, build_order(20, false, 42));
    }

    #[test]
    fn rejects_duplicates_and_out_of_range() {
        assert!(!is_permutation(&[0, 0, 1], 3));
        assert!(!is_permutation(&[0, 1, 3], 3));
        assert!(!is_permutation(&[0, 1], 3));
        assert!(is_permutation(&[2, 0, 1], 3));
    }

    #[test]
    fn ordered_keeps_original_indices() {
        let bank = questions(3);
        let presented = ordered(&bank, &[2, 0, 1]);

        let indices: Vec<u32> = presented.iter().map(|(index, _)| *index).collect();
        assert_eq!(indices, vec![2, 0, 1]);
        assert_eq!(presented[0].1.text, "Q2");
    }

    #[test]
    fn ordered_falls_back_to_identity() {
        let bank = questions(2);
        let presented = ordered(&bank, &[5]);

        assert_eq!(presented.len(), 2);
        assert_eq!(presented[1].0, 1);
    }
}
