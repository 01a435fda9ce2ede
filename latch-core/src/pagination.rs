//! In-memory page slicing

use serde::Serialize;

use crate::error::{AuthError, AuthResult};

/// Slice `items` into 1-indexed pages of `limit` entries.
///
/// A page that starts at or past the end of the collection is an error, even
/// for an empty collection at page 1.
pub fn paginate<T>(items: &[T], page: u64, limit: u64) -> AuthResult<&[T]> {
    if limit == 0 {
        return Err(AuthError::validation("limit must be greater than 0"));
    }
    let out_of_range = AuthError::PageOutOfRange { page };

    let start = page
        .checked_sub(1)
        .and_then(|p| p.checked_mul(limit))
        .ok_or_else(|| out_of_range.clone())?;
    let len = items.len() as u64;
    if start >= len {
        return Err(out_of_range);
    }
    let end = page.saturating_mul(limit).min(len);

    Ok(&items[start as usize..end as usize])
}

/// One page of a listing together with the size of the whole collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub data: Vec<T>,
}

impl<T: Clone> Paginated<T> {
    pub fn from_items(items: &[T], page: u64, limit: u64) -> AuthResult<Self> {
        let data = paginate(items, page, limit)?.to_vec();
        Ok(Self {
            page,
            limit,
            total: items.len() as u64,
            data,
        })
    }
}

impl<T> Paginated<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            page: self.page,
            limit: self.limit,
            total: self.total,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}
