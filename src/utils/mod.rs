use uuid::Uuid;

/// Normalizes an unordered pair so both argument orders yield the same key.
pub fn ordered_pair<'a>(user_id_a: &'a Uuid, user_id_b: &'a Uuid) -> (&'a Uuid, &'a Uuid) {
    if user_id_a <= user_id_b {
        (user_id_a, user_id_b)
    } else {
        (user_id_b, user_id_a)
    }
}
