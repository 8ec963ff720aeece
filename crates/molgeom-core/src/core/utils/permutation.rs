/// Whether `permuted` is an even permutation of `reference`.
///
/// Both slices must hold the same distinct items. Returns `None` if they do not.
pub fn is_even_permutation<T: PartialEq>(reference: &[T], permuted: &[T]) -> Option<bool> {
    if reference.len() != permuted.len() {
        return None;
    }
    let positions: Vec<usize> = permuted
        .iter()
        .map(|item| reference.iter().position(|r| r == item))
        .collect::<Option<_>>()?;
    if has_duplicates(&positions) {
        return None;
    }

    let mut visited = vec![false; positions.len()];
    let mut transpositions = 0;
    for start in 0..positions.len() {
        if visited[start] {
            continue;
        }
        let mut cycle_len = 0;
        let mut idx = start;
        while !visited[idx] {
            visited[idx] = true;
            idx = positions[idx];
            cycle_len += 1;
        }
        transpositions += cycle_len - 1;
    }

    Some(transpositions % 2 == 0)
}

fn has_duplicates(positions: &[usize]) -> bool {
    let mut seen = vec![false; positions.len()];
    for &p in positions {
        if seen[p] {
            return true;
        }
        seen[p] = true;
    }
    false
}
