// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

pub const MURMUR3_DEFAULT_SEED: u32 = 0;

const C1: u32 = 0xCC9E_2D51;
const C2: u32 = 0x1B87_3593;
const R1: u32 = 15;
const R2: u32 = 13;
const M: u32 = 5;
const N: u32 = 0xE654_6B64;
const CHUNK_SIZE: usize = 4;

/// Hashes the data using 32-bit Murmur3 hash with 0 as seed.
///
/// Used to derive a stable, process-independent rank from a worker's
/// identity during server preference computation.
pub fn hash_bytes(data: &[u8]) -> u32 {
    hash_bytes_with_seed(data, MURMUR3_DEFAULT_SEED)
}

#[inline(always)]
fn hash_bytes_with_seed(data: &[u8], seed: u32) -> u32 {
    let length = data.len();
    let chunks = length / CHUNK_SIZE;
    let length_aligned = chunks * CHUNK_SIZE;

    let mut h1 = hash_full_chunks(data, seed);
    let mut k1 = 0u32;

    for (shift, &b) in data[length_aligned..].iter().enumerate() {
        k1 |= (b as u32) << (8 * shift);
    }

    h1 ^= k1.wrapping_mul(C1).rotate_left(R1).wrapping_mul(C2);

    fmix(h1, length)
}

#[inline(always)]
fn hash_full_chunks(data: &[u8], seed: u32) -> u32 {
    data.chunks_exact(CHUNK_SIZE).fold(seed, |h1, chunk| {
        let block = u32::from_le_bytes(chunk.try_into().unwrap());
        let k1 = mix_k1(block);
        mix_h1(h1, k1)
    })
}

#[inline(always)]
fn mix_k1(k1: u32) -> u32 {
    k1.wrapping_mul(C1).rotate_left(R1).wrapping_mul(C2)
}

#[inline(always)]
fn mix_h1(h1: u32, k1: u32) -> u32 {
    (h1 ^ k1).rotate_left(R2).wrapping_mul(M).wrapping_add(N)
}

// Finalization mix - force all bits of a hash block to avalanche
#[inline(always)]
fn fmix(mut h1: u32, length: usize) -> u32 {
    h1 ^= length as u32;
    bit_mix(h1)
}

const BIT_MIX_A: u32 = 0x85EB_CA6B;
const BIT_MIX_B: u32 = 0xC2B2_AE35;

#[inline(always)]
fn bit_mix(mut input: u32) -> u32 {
    input = input ^ (input >> 16);
    input = input.wrapping_mul(BIT_MIX_A);
    input = input ^ (input >> 13);
    input = input.wrapping_mul(BIT_MIX_B);
    input = input ^ (input >> 16);
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_murmur3() {
        let empty_data_hash = hash_bytes(&[]);
        assert_eq!(empty_data_hash, 0);

        let empty_data_hash = hash_bytes_with_seed(&[], 1);
        assert_eq!(0x514E_28B7, empty_data_hash);

        let empty_data_hash = hash_bytes_with_seed(&[], 0xFFFF_FFFF);
        assert_eq!(0x81F1_6F39, empty_data_hash);

        let hash = hash_bytes("The quick brown fox jumps over the lazy dog".as_bytes());
        assert_eq!(0x2E4F_F723, hash);

        let hash = hash_bytes_with_seed(
            "The quick brown fox jumps over the lazy dog".as_bytes(),
            0x9747_B28C,
        );
        assert_eq!(0x2FA8_26CD, hash);
    }

    #[test]
    fn stable_across_calls() {
        let a = hash_bytes(b"worker-3");
        let b = hash_bytes(b"worker-3");
        assert_eq!(a, b);
        assert_ne!(hash_bytes(b"worker-3"), hash_bytes(b"worker-4"));
    }
}
