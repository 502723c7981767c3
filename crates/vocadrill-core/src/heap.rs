// Copyright 2026 The vocadrill developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// The interface the session manager schedules against. Keeps the
/// session code agnostic to the concrete heap implementation.
pub trait PriorityQueue<T: Ord> {
    /// The smallest element, without removing it.
    fn peek(&self) -> Option<&T>;
    /// Removes and returns the smallest element.
    fn pop(&mut self) -> Option<T>;
    fn insert(&mut self, value: T);
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

/// An array-backed binary min-heap.
pub struct BinaryMinHeap<T: Ord> {
    arena: Vec<T>,
}

impl<T: Ord> BinaryMinHeap<T> {
    pub fn new() -> Self {
        Self { arena: Vec::new() }
    }

    pub fn from_vec(values: Vec<T>) -> Self {
        let mut heap = Self::new();
        for value in values {
            heap.insert(value);
        }
        heap
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.arena[i] >= self.arena[parent] {
                break;
            }
            self.arena.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.arena.len();
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut smallest = i;
            if left < len && self.arena[left] < self.arena[smallest] {
                smallest = left;
            }
            if right < len && self.arena[right] < self.arena[smallest] {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.arena.swap(i, smallest);
            i = smallest;
        }
    }
}

impl<T: Ord> Default for BinaryMinHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> PriorityQueue<T> for BinaryMinHeap<T> {
    fn peek(&self) -> Option<&T> {
        self.arena.first()
    }

    fn pop(&mut self) -> Option<T> {
        if self.arena.is_empty() {
            return None;
        }
        let last = self.arena.len() - 1;
        self.arena.swap(0, last);
        let smallest = self.arena.pop();
        self.sift_down(0);
        smallest
    }

    fn insert(&mut self, value: T) {
        self.arena.push(value);
        self.sift_up(self.arena.len() - 1);
    }

    fn size(&self) -> usize {
        self.arena.len()
    }
}
