use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rich_undo_engine::{RichBuffer, TextBuffer, UndoManager};

fn generate_prose(words: usize) -> String {
    let base = ["lorem", "ipsum", "dolor", "sit", "amet", "consectetur"];
    let mut text = String::new();
    for i in 0..words {
        if i > 0 {
            text.push(if i % 12 == 0 { '\n' } else { ' ' });
        }
        text.push_str(base[i % base.len()]);
    }
    text
}

fn type_text(buffer: &mut RichBuffer, text: &str) {
    for ch in text.chars() {
        buffer.insert_at_cursor(ch.encode_utf8(&mut [0; 4]));
    }
}

fn bench_typing_capture(c: &mut Criterion) {
    let mut group = c.benchmark_group("typing");
    group.sample_size(10);

    for words in [10, 100, 500] {
        let prose = generate_prose(words);
        group.bench_with_input(BenchmarkId::new("recorded", words), &prose, |b, prose| {
            b.iter(|| {
                let mut buffer = RichBuffer::from_bytes(b"").unwrap();
                let manager = UndoManager::attach(&mut buffer);
                type_text(&mut buffer, std::hint::black_box(prose));
                std::hint::black_box(manager.undo_depth());
            });
        });
        group.bench_with_input(BenchmarkId::new("frozen", words), &prose, |b, prose| {
            b.iter(|| {
                let mut buffer = RichBuffer::from_bytes(b"").unwrap();
                let manager = UndoManager::attach(&mut buffer);
                let _frozen = manager.frozen();
                type_text(&mut buffer, std::hint::black_box(prose));
                std::hint::black_box(buffer.len());
            });
        });
    }

    group.finish();
}

fn bench_undo_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    group.sample_size(10);

    let prose = generate_prose(200);
    group.bench_function("undo_redo_all", |b| {
        let mut buffer = RichBuffer::from_bytes(b"").unwrap();
        let manager = UndoManager::attach(&mut buffer);
        type_text(&mut buffer, &prose);
        b.iter(|| {
            while manager.can_undo() {
                manager.undo(&mut buffer);
            }
            while manager.can_redo() {
                manager.redo(&mut buffer);
            }
            std::hint::black_box(buffer.len());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_typing_capture, bench_undo_replay);
criterion_main!(benches);
