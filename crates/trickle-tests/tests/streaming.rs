//! Streaming decode over tokio readers.
//!
//! Values arrive over an in-memory duplex pipe written in small, uneven
//! pieces by a separate task, the way a socket delivers a message.

use tokio::io::AsyncWriteExt;
use trickle_compose::StreamingDecoder;
use trickle_decoders::DecoderExt;
use trickle_decoders::common::{Endianness, int_decoder};
use trickle_tests::{Tree, tree_decoder};
use trickle_wire::DecodeError;

#[tokio::test]
async fn trees_over_a_pipe() {
    let _ = env_logger::builder().is_test(true).try_init();
    let trees = vec![Tree::complete(2, 3), Tree::leaf("solo", -1), Tree::complete(4, 1)];
    let mut bytes = Vec::new();
    for tree in &trees {
        bytes.extend(tree.to_bytes());
    }

    let (mut tx, rx) = tokio::io::duplex(16);
    let writer = tokio::spawn(async move {
        for (i, piece) in bytes.chunks(7).enumerate() {
            tx.write_all(piece).await.unwrap();
            if i % 3 == 0 {
                tokio::task::yield_now().await;
            }
        }
    });

    let mut stream = StreamingDecoder::with_chunk_size(rx, tree_decoder(), 5);
    let mut decoded = Vec::new();
    while let Some(tree) = stream.next().await {
        decoded.push(tree.unwrap());
    }
    writer.await.unwrap();
    assert_eq!(decoded, trees);
}

#[tokio::test]
async fn pipe_closed_mid_value() {
    let (mut tx, rx) = tokio::io::duplex(64);
    tx.write_all(&[0, 0, 0, 9, 0, 0, 0, 2, 0, 0]).await.unwrap();
    drop(tx);

    let decoder = int_decoder(Endianness::Big).to_vec_exact(2);
    let mut stream = StreamingDecoder::new(rx, decoder);
    assert_eq!(stream.next().await.unwrap().unwrap(), vec![9, 2]);
    let error = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(error, DecodeError::UnexpectedEof { pending: 2 }));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn decode_errors_reset_the_decoder() {
    let bytes: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 1, 0, 0, 0, 5];
    let decoder = int_decoder(Endianness::Big).to_vec(int_decoder(Endianness::Big));
    let mut stream = StreamingDecoder::new(bytes, decoder);
    assert!(matches!(
        stream.next().await,
        Some(Err(DecodeError::NegativeLength { length: -1 }))
    ));
    assert_eq!(stream.next().await.unwrap().unwrap(), vec![5]);
    assert!(stream.next().await.is_none());
}
