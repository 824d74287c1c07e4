mod unit_tiny_code_generator;
