mod unit_semantic_analyser;
