use rand::seq::SliceRandom;
use rand::Rng;

use crate::types::VertexId;

/// Bijective mapping between the caller's point order ("user" indices) and the order in which
/// points were handed to the triangulation engine ("engine" indices).
///
/// Invariant: `to_engine[to_user[i]] == i` for every engine index `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    /// For each engine index, the user index of the point stored there
    to_user: Vec<VertexId>,
    /// For each user index, the engine index where the point ended up
    to_engine: Vec<VertexId>,
}

impl Permutation {
    pub fn identity(len: usize) -> Self {
        let to_user: Vec<VertexId> = (0..len).collect();
        Self {
            to_engine: to_user.clone(),
            to_user,
        }
    }

    pub fn random<R: Rng>(len: usize, rng: &mut R) -> Self {
        let mut to_user: Vec<VertexId> = (0..len).collect();
        to_user.shuffle(rng);

        let mut to_engine = vec![0; len];
        for (engine_index, &user_index) in to_user.iter().enumerate() {
            to_engine[user_index] = engine_index;
        }
        Self { to_user, to_engine }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.to_user.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.to_user.is_empty()
    }

    #[inline]
    pub fn to_user_index(&self, engine_index: VertexId) -> VertexId {
        self.to_user[engine_index]
    }

    #[inline]
    pub fn to_engine_index(&self, user_index: VertexId) -> VertexId {
        self.to_engine[user_index]
    }

    /// Reorders a per-point array from user order into engine order.
    pub fn shuffle<T: Copy>(&self, values: &[T]) -> Vec<T> {
        self.to_user.iter().map(|&user| values[user]).collect()
    }

    /// Reorders a per-point array from engine order back into user order.
    pub fn deshuffle<T: Copy>(&self, values: &[T]) -> Vec<T> {
        self.to_engine
            .iter()
            .map(|&engine| values[engine])
            .collect()
    }
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
