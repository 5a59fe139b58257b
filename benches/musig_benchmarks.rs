// Copyright 2019 Stichting Organism
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

#[macro_use]
extern crate criterion;

mod musig_benches {
    use criterion::{BenchmarkId, Criterion};
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;
    use utxo_musig::musig::{AggregateNonce, NonceStore, PublicNonce, Session};
    use utxo_musig::taproot::TapTree;
    use utxo_musig::*;

    fn keypairs(n: usize) -> Vec<Keypair> {
        let mut csprng = ChaChaRng::from_seed([0u8; 32]);
        (0..n).map(|_| Keypair::generate(&mut csprng)).collect()
    }

    fn key_aggregation(c: &mut Criterion) {
        static SIZES: [usize; 4] = [2, 3, 16, 64];

        let mut group = c.benchmark_group("MuSig2 key aggregation");
        for size in SIZES.iter() {
            let pubkeys: Vec<PublicKey> = keypairs(*size).iter().map(|k| k.public).collect();
            group.bench_with_input(BenchmarkId::from_parameter(size), &pubkeys, |b, pubkeys| {
                b.iter(|| KeyAggContext::new(pubkeys.clone()))
            });
        }
        group.finish();
    }

    fn partial_sign(c: &mut Criterion) {
        let signers = keypairs(2);
        let pubkeys: Vec<PublicKey> = signers.iter().map(|k| k.public).collect();
        let ctx = KeyAggContext::new(pubkeys).unwrap();
        let mut csprng = ChaChaRng::from_seed([1u8; 32]);
        let store = NonceStore::new();

        c.bench_function("MuSig2 partial signing", move |b| {
            b.iter(|| {
                let nonces: Vec<PublicNonce> = signers
                    .iter()
                    .map(|k| store.generate(&mut csprng, Some(&k.secret), &k.public, None, None).unwrap())
                    .collect();
                let session = Session::start(&AggregateNonce::sum(&nonces), b"bench", &ctx);
                session.partial_sign(&store, &signers[0].secret, &nonces[0]).unwrap();
                store.clear();
            })
        });
    }

    fn taptree_construction(c: &mut Criterion) {
        static SIZES: [usize; 3] = [3, 16, 128];

        let mut group = c.benchmark_group("Huffman taptree construction");
        let config = TaptreeConfig::default();
        for size in SIZES.iter() {
            let scripts: Vec<Vec<u8>> = (0..*size).map(|i| vec![0x51, i as u8]).collect();
            group.bench_with_input(BenchmarkId::from_parameter(size), &scripts, |b, scripts| {
                b.iter(|| TapTree::from_huffman(scripts, None, &config))
            });
        }
        group.finish();
    }

    criterion_group! {
        name = musig_benches;
        config = Criterion::default();
        targets =
            key_aggregation,
            partial_sign,
            taptree_construction,
    }
}

criterion_main!(musig_benches::musig_benches);
