//! Layer behavior on string tokens and across threads.

use std::sync::Arc;
use std::thread;

use ndarray::array;
use verba_layers::{
    MaskedLmConfig, MaskedLmMaskGenerator, PreprocessingLayer, RandomSwap, SkipRule,
    StartEndPacker, StartEndPackerConfig,
};

fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

#[test]
fn test_string_packing() {
    let packer = StartEndPacker::new(
        StartEndPackerConfig::new(5, "[PAD]".to_string())
            .with_start_value(vec!["[START]".to_string()])
            .with_end_value(vec!["[END]".to_string()]),
    )
    .unwrap();
    let output = packer
        .call(&[words("KerasNLP is awesome"), words("amazing")])
        .unwrap();
    assert_eq!(
        output.values,
        array![
            ["[START]", "KerasNLP", "is", "awesome", "[END]"],
            ["[START]", "amazing", "[END]", "[PAD]", "[PAD]"]
        ]
        .mapv(str::to_string)
    );
}

#[test]
fn test_string_packing_with_multiple_special_values() {
    let packer = StartEndPacker::new(
        StartEndPackerConfig::new(6, "[PAD]".to_string())
            .with_start_value(words("[END] [START]"))
            .with_end_value(words("[END]")),
    )
    .unwrap();
    let output = packer
        .call(&[words("KerasNLP is awesome"), words("amazing")])
        .unwrap();
    assert_eq!(
        output.values.row(1).to_vec(),
        words("[END] [START] amazing [END] [PAD] [PAD]")
    );
}

#[test]
fn test_word_swap_keeps_skip_list_in_place() {
    let layer = RandomSwap::new(0.9)
        .unwrap()
        .with_skip(SkipRule::list(words("Keras")))
        .with_seed(42);
    let input = vec![words("Hey I like"), words("Keras and Tensorflow")];
    for _ in 0..10 {
        let output = layer.call(&input).unwrap();
        assert_eq!(output[1][0], "Keras");
        let mut first = output[0].clone();
        first.sort();
        assert_eq!(first, words("Hey I like"));
    }
}

#[test]
fn test_char_swap() {
    let layer = RandomSwap::new(0.4).unwrap().with_seed(42);
    let chars: Vec<char> = "Hey Dude".chars().collect();
    let output = layer.swap_sequence(&chars).unwrap();
    let mut expected = chars.clone();
    let mut actual = output.clone();
    expected.sort_unstable();
    actual.sort_unstable();
    assert_eq!(actual, expected);
}

#[test]
fn test_generator_shared_between_threads() {
    let generator = Arc::new(
        MaskedLmMaskGenerator::new(MaskedLmConfig::new(100, 0.5, 3, 1).with_seed(7)).unwrap(),
    );
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let generator = Arc::clone(&generator);
            thread::spawn(move || {
                let batch = vec![vec![5u32; 10]; 8];
                generator.call(&batch).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let output = handle.join().unwrap();
        assert_eq!(output.mask_positions.dim(), (8, 3));
        for row in 0..8 {
            let selected = output.mask_weights.row(row).sum() as usize;
            let masked_ids = output.mask_ids.row(row);
            assert!(masked_ids.iter().take(selected).all(|&id| id == 5));
            assert!(masked_ids.iter().skip(selected).all(|&id| id == 0));
        }
    }
}
